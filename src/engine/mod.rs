//! The audio-thread engine: voice pool, note dispatch and the per-block
//! process pass.

/*
Engine Block
============

    process_audio()
      │
      ├─ drain control messages (at most what was queued when the block began)
      │     Dispatch                      run now
      │     DispatchUnderStructureLock    try_lock; if held, park and stop draining
      │     Midi / Stop / Restart
      │
      ├─ stopped?  → clear busses, return (silence)
      │
      ├─ Patch → Part → Group → Zone → Voice    render and mix into busses
      │                         └─ finished voices leave their zone here
      ├─ busses mix down to main
      │
      └─ shared UI state: VU levels, voice display


Voice Pool
----------

The pool is a boxed slice of `Option<Voice>` sized once at construction.
A slot is free when it is empty or its voice is no longer assigned. Starting
a voice overwrites the slot in place. When every slot is busy the note is
dropped.
*/

pub mod bus;
pub mod group;
pub mod keyboard;
pub mod memory_pool;
pub mod part;
pub mod patch;
pub mod retune;
pub mod ui_state;
pub mod zone;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::dsp::mix::StereoBlock;
use crate::dsp::tables::Tables;
use crate::messaging::{
    AudioThreadCallback, AudioToControl, ControlToAudio, MessageController, MidiEvent,
    StructureEntry,
};
use crate::processor::ProcessorStorage;
use crate::voice::{NoteInfo, Voice, VoiceContext, VoiceId, VoiceStart, ZonePath};
use crate::{BLOCK_SIZE, MAX_VOICES, PROCESSORS_PER_ZONE};

use self::bus::BusAddress;
use self::group::Group;
use self::memory_pool::MemoryPool;
use self::patch::Patch;
use self::retune::MidiKeyRetuner;
use self::ui_state::{SharedUiState, VoiceDisplayItem};
use self::zone::{PlayMode, Zone};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique id for parts, groups and zones.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A processor slot on a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorAddress {
    pub part: usize,
    pub group: usize,
    pub zone: usize,
    pub slot: usize,
}

pub struct Engine {
    config: EngineConfig,
    sample_rate: f32,
    tables: Tables,
    retuner: MidiKeyRetuner,
    patch: Box<Patch>,
    voices: Box<[Option<Voice>]>,
    pool: MemoryPool,
    rng: StdRng,

    from_control: Consumer<ControlToAudio>,
    to_control: Producer<AudioToControl>,
    structure_lock: Arc<Mutex<()>>,
    parked: Option<ControlToAudio>,
    stop_engine_requests: u32,

    ui_state: Arc<SharedUiState>,
    blocks_processed: u64,
    midi_note_state_counter: u64,
    last_midi_note_state_counter: u64,
    blocks_since_display_update: u32,
}

impl Engine {
    /// Build an engine and the controller that talks to it. Move the engine
    /// to the audio thread and keep the controller on the control thread.
    pub fn new(config: EngineConfig) -> (Engine, MessageController) {
        let capacity = config.message_queue_capacity.max(1);
        let (to_audio, from_control) = RingBuffer::new(capacity);
        let (to_control, from_audio) = RingBuffer::new(capacity);
        let structure_lock = Arc::new(Mutex::new(()));
        let ui_state = Arc::new(SharedUiState::new());
        let sample_rate = config.effective_sample_rate();

        let mut patch = Box::new(Patch::new());
        patch.set_sample_rate(sample_rate);

        let engine = Engine {
            sample_rate,
            tables: Tables::new(),
            retuner: MidiKeyRetuner::new(),
            patch,
            voices: (0..MAX_VOICES).map(|_| None).collect(),
            pool: MemoryPool::new(config.memory_pool_block_len, config.memory_pool_blocks),
            rng: StdRng::seed_from_u64(config.rng_seed),
            from_control,
            to_control,
            structure_lock: Arc::clone(&structure_lock),
            parked: None,
            stop_engine_requests: 0,
            ui_state: Arc::clone(&ui_state),
            blocks_processed: 0,
            midi_note_state_counter: 0,
            last_midi_note_state_counter: 0,
            blocks_since_display_update: 0,
            config: config.clone(),
        };
        let controller =
            MessageController::new(config, to_audio, from_audio, structure_lock, ui_state);

        info!(
            sample_rate,
            max_voices = engine.config.voice_limit(),
            block_size = BLOCK_SIZE,
            "engine constructed"
        );
        (engine, controller)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    pub fn patch_mut(&mut self) -> &mut Patch {
        &mut self.patch
    }

    pub fn memory_pool(&self) -> &MemoryPool {
        &self.pool
    }

    pub fn ui_state(&self) -> &Arc<SharedUiState> {
        &self.ui_state
    }

    /// Main bus output of the last block.
    pub fn output(&self) -> &StereoBlock {
        &self.patch.busses.main_bus.output
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_engine_requests > 0
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().flatten().filter(|v| v.is_voice_assigned)
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id.0).and_then(Option::as_ref)
    }

    pub fn zone(&self, path: ZonePath) -> Option<&Zone> {
        self.patch.part(path.part)?.group(path.group)?.zone(path.zone)
    }

    pub fn zone_mut(&mut self, path: ZonePath) -> Option<&mut Zone> {
        self.patch
            .part_mut(path.part)?
            .group_mut(path.group)?
            .zone_mut(path.zone)
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            trace!(sample_rate, "ignoring invalid sample rate");
            return;
        };
        self.sample_rate = sample_rate;
        self.patch.set_sample_rate(sample_rate);
        for voice in self.voices.iter_mut().flatten() {
            voice.set_sample_rate(sample_rate);
        }
        debug!(sample_rate, "sample rate changed");
    }

    /// Voices that are assigned and still sounding.
    pub fn active_voice_count(&self) -> u32 {
        self.voices
            .iter()
            .flatten()
            .filter(|v| v.is_voice_assigned && v.is_voice_playing)
            .count() as u32
    }

    /// Render one block. Call once per `BLOCK_SIZE` frames on the audio thread.
    pub fn process_audio(&mut self) {
        let voices_before = self.active_voice_count();
        self.drain_control_messages();
        self.blocks_processed += 1;

        if self.stop_engine_requests > 0 {
            self.patch.busses.clear();
            return;
        }

        let Self {
            patch,
            voices,
            pool,
            tables,
            retuner,
            sample_rate,
            ..
        } = self;
        patch.process(voices, pool, tables, retuner, *sample_rate);

        for (i, bus) in self.patch.busses.iter().enumerate() {
            self.ui_state.set_vu_level(i, bus.vu_level);
        }
        self.update_voice_display(voices_before);
    }

    fn update_voice_display(&mut self, voices_before: u32) {
        let voices_now = self.active_voice_count();
        if voices_now != voices_before {
            self.send_to_control(AudioToControl::VoiceCountChanged(voices_now));
        }
        let do_update = voices_now != voices_before
            || (voices_now != 0
                && self.config.send_sample_position
                && self.blocks_since_display_update >= self.config.voice_display_update_every)
            || self.midi_note_state_counter != self.last_midi_note_state_counter;

        if do_update {
            self.blocks_since_display_update = 0;
            self.last_midi_note_state_counter = self.midi_note_state_counter;
            for (i, slot) in self.voices.iter().enumerate() {
                let item = match slot {
                    Some(v) if v.is_voice_assigned && v.is_voice_playing => VoiceDisplayItem {
                        active: true,
                        gated: v.is_gated,
                        part: v.path.part as i32,
                        group: v.path.group as i32,
                        zone: v.path.zone as i32,
                        midi_note: v.note.original_key as i32,
                        midi_channel: v.note.channel as i32,
                        sample_pos: v.sample_position(),
                    },
                    _ => VoiceDisplayItem::default(),
                };
                self.ui_state.set_voice(i, item);
            }
            self.ui_state.set_voice_count(voices_now);
            self.ui_state.bump_display_generation();
        }
        self.blocks_since_display_update = self.blocks_since_display_update.saturating_add(1);
    }

    fn drain_control_messages(&mut self) {
        // Only what is already queued; later pushes wait for the next block.
        let mut budget = self.from_control.slots() + usize::from(self.parked.is_some());
        while budget > 0 {
            budget -= 1;
            let msg = match self.parked.take() {
                Some(msg) => msg,
                None => match self.from_control.pop() {
                    Ok(msg) => msg,
                    Err(_) => break,
                },
            };
            match msg {
                ControlToAudio::Dispatch(cb) => self.run_callback(cb),
                ControlToAudio::DispatchUnderStructureLock(cb) => {
                    let lock = Arc::clone(&self.structure_lock);
                    let Some(_guard) = lock.try_lock() else {
                        trace!("structure lock held, deferring callback");
                        self.parked = Some(ControlToAudio::DispatchUnderStructureLock(cb));
                        break;
                    };
                    self.run_callback(cb);
                }
                ControlToAudio::Midi(event) => self.handle_midi(event),
                ControlToAudio::StopEngine => self.stop_engine_requests += 1,
                ControlToAudio::RestartEngine => {
                    self.stop_engine_requests = self.stop_engine_requests.saturating_sub(1)
                }
            }
        }
    }

    fn run_callback(&mut self, mut cb: AudioThreadCallback) {
        (cb.exec)(self);
        self.send_to_control(AudioToControl::CallbackComplete(cb));
    }

    pub(crate) fn send_to_control(&mut self, msg: AudioToControl) {
        if let Err(PushError::Full(_)) = self.to_control.push(msg) {
            trace!("control queue full, dropping audio-to-control message");
        }
    }

    /// Ask the control side to resend the part/group/zone structure.
    pub fn send_structure_refresh(&mut self) {
        self.send_to_control(AudioToControl::StructureRefresh);
    }

    pub fn handle_midi(&mut self, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn {
                channel,
                key,
                note_id,
                velocity,
            } => self.note_on(channel, key, note_id, velocity),
            MidiEvent::NoteOff {
                channel,
                key,
                note_id,
                velocity,
            } => self.note_off(channel, key, note_id, velocity),
            MidiEvent::PitchBend { channel, value } => self.pitch_bend(channel, value),
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => self.midi_cc(channel, controller, value),
            MidiEvent::ChannelAftertouch { .. } | MidiEvent::PolyAftertouch { .. } => {}
        }
    }

    /// Start one voice on every zone that maps this key and velocity.
    pub fn note_on(&mut self, channel: i16, key: i16, note_id: i32, velocity: i16) {
        let use_key = self.retuner.remap_key_to(channel, key);
        let note = NoteInfo {
            channel,
            key: use_key,
            original_key: key,
            note_id,
            velocity,
        };
        self.trigger_zones(note, |mode| mode != PlayMode::OnRelease);
        self.midi_note_state_counter += 1;
    }

    /// Release matching voices, then start any on-release zones for the key.
    /// A wildcard key (-1) only releases.
    pub fn note_off(&mut self, channel: i16, key: i16, note_id: i32, velocity: i16) {
        self.release_voice(channel, key, note_id);
        if key < 0 {
            self.midi_note_state_counter += 1;
            return;
        }
        let use_key = self.retuner.remap_key_to(channel, key);
        let note = NoteInfo {
            channel,
            key: use_key,
            original_key: key,
            note_id,
            velocity,
        };
        let started = self.trigger_zones(note, |mode| mode == PlayMode::OnRelease);
        for id in started.iter().flatten() {
            if let Some(voice) = self.voices.get_mut(id.0).and_then(Option::as_mut) {
                voice.release();
            }
        }
        self.midi_note_state_counter += 1;
    }

    fn trigger_zones(
        &mut self,
        note: NoteInfo,
        wants: impl Fn(PlayMode) -> bool,
    ) -> [Option<VoiceId>; MAX_VOICES] {
        let mut paths = [None; MAX_VOICES];
        let found = self.find_zones(note.channel, note.key, note.velocity, &wants, &mut paths);
        let mut started = [None; MAX_VOICES];
        for (i, path) in paths.iter().take(found).flatten().enumerate() {
            started[i] = self.initiate_voice(*path, note);
        }
        started
    }

    fn find_zones(
        &self,
        channel: i16,
        key: i16,
        velocity: i16,
        wants: &impl Fn(PlayMode) -> bool,
        out: &mut [Option<ZonePath>; MAX_VOICES],
    ) -> usize {
        let mut n = 0;
        for (pi, part) in self.patch.parts.iter().enumerate() {
            if !part.responds_to(channel) {
                continue;
            }
            for (gi, group) in part.groups().iter().enumerate() {
                for (zi, zone) in group.zones().iter().enumerate() {
                    let mapped = zone.mapping.keyboard_range.includes(key)
                        && zone.mapping.velocity_range.includes(velocity);
                    if !mapped || !wants(zone.sample_data[0].play_mode) {
                        continue;
                    }
                    if zone.sample_pointers[0].is_none() {
                        trace!(part = pi, group = gi, zone = zi, "zone has no sample");
                        continue;
                    }
                    if n == out.len() {
                        return n;
                    }
                    out[n] = Some(ZonePath::new(pi, gi, zi));
                    n += 1;
                }
            }
        }
        n
    }

    /// Claim the first free slot for a voice on `path`. Returns `None` when the
    /// pool is full or the path does not resolve.
    pub fn initiate_voice(&mut self, path: ZonePath, note: NoteInfo) -> Option<VoiceId> {
        let limit = self.config.voice_limit().min(self.voices.len());
        let Some(index) = self.voices[..limit]
            .iter()
            .position(|v| v.as_ref().map_or(true, |v| !v.is_voice_assigned))
        else {
            trace!(key = note.key, "voice pool exhausted, dropping note");
            self.ui_state.count_dropped_note();
            return None;
        };
        let id = VoiceId(index);
        let engine_seconds =
            self.blocks_processed as f64 * BLOCK_SIZE as f64 / self.sample_rate as f64;

        let Self {
            patch,
            voices,
            pool,
            rng,
            tables,
            retuner,
            sample_rate,
            ..
        } = self;
        let part = patch.parts.get_mut(path.part)?;
        let vctx = VoiceContext {
            tables,
            retuner,
            sample_rate: *sample_rate,
            pitch_bend: part.controllers.pitch_bend.output,
            mod_wheel: part.controllers.mod_wheel(),
        };
        let group = part.group_mut(path.group)?;
        let zone = group.zone_mut(path.zone)?;

        let slot = &mut voices[index];
        let voice = slot.insert(Voice::new(id, path, note, *sample_rate));
        voice.voice_started(
            zone,
            &vctx,
            VoiceStart {
                pool: &mut *pool,
                rng: &mut *rng,
                engine_seconds,
            },
        );
        if zone.add_voice(id) {
            group.add_active_zone(rng, engine_seconds);
        }
        trace!(voice = index, key = note.key, ?path, "voice initiated");
        Some(id)
    }

    /// Release every assigned voice matching the filter. `-1` matches anything.
    pub fn release_voice(&mut self, channel: i16, key: i16, note_id: i32) {
        for voice in self.voices.iter_mut().flatten() {
            let n = &voice.note;
            if voice.is_voice_assigned
                && (n.original_key == key || key == -1)
                && (n.channel == channel || channel == -1 || n.channel == -1)
                && (n.note_id == note_id || n.note_id == -1 || note_id == -1)
            {
                voice.release();
            }
        }
    }

    /// `value` is -8192..8191.
    pub fn pitch_bend(&mut self, channel: i16, value: i16) {
        let target = value as f32 / 8192.0;
        for part in self.patch.parts.iter_mut().filter(|p| p.responds_to(channel)) {
            part.controllers.pitch_bend.set_target(target);
        }
    }

    pub fn midi_cc(&mut self, channel: i16, controller: i16, value: i16) {
        let Some(index) = usize::try_from(controller).ok().filter(|&c| c < 128) else {
            debug!(controller, "ignoring out of range controller");
            return;
        };
        let target = value as f32 / 127.0;
        for part in self.patch.parts.iter_mut().filter(|p| p.responds_to(channel)) {
            part.controllers.midi_cc[index].set_target(target);
        }
    }

    /// Stop every voice on `path` now, without a release.
    fn kill_voices_on(&mut self, matches: impl Fn(&ZonePath) -> bool) {
        let Self {
            patch, voices, pool, ..
        } = self;
        for voice in voices.iter_mut().flatten() {
            if !voice.is_voice_assigned || !matches(&voice.path) {
                continue;
            }
            let path = voice.path;
            voice.cleanup(pool);
            if let Some(group) = patch
                .parts
                .get_mut(path.part)
                .and_then(|p| p.group_mut(path.group))
            {
                let became_inactive = group
                    .zone_mut(path.zone)
                    .is_some_and(|z| z.remove_voice(voice.id));
                if became_inactive {
                    group.remove_active_zone();
                }
            }
        }
    }

    /// Detach a zone from the tree. Its voices stop immediately and voices on
    /// later zones of the same group are re-pointed.
    pub fn remove_zone(&mut self, path: ZonePath) -> Option<Box<Zone>> {
        self.zone(path)?;
        self.kill_voices_on(|p| *p == path);
        for voice in self.voices.iter_mut().flatten() {
            let p = &mut voice.path;
            if voice.is_voice_assigned
                && p.part == path.part
                && p.group == path.group
                && p.zone > path.zone
            {
                p.zone -= 1;
            }
        }
        self.patch
            .part_mut(path.part)?
            .group_mut(path.group)?
            .remove_zone(path.zone)
    }

    /// Detach a group and every zone in it.
    pub fn remove_group(&mut self, part: usize, group: usize) -> Option<Box<Group>> {
        self.patch.part(part)?.group(group)?;
        self.kill_voices_on(|p| p.part == part && p.group == group);
        for voice in self.voices.iter_mut().flatten() {
            let p = &mut voice.path;
            if voice.is_voice_assigned && p.part == part && p.group > group {
                p.group -= 1;
            }
        }
        self.patch.part_mut(part)?.remove_group(group)
    }

    /// Stop every voice immediately.
    pub fn all_sound_off(&mut self) {
        self.kill_voices_on(|_| true);
    }

    /// Set a bus effect. Same-type settings update the running processor in
    /// place; anything else replaces it, returning any pooled memory the old
    /// one held.
    pub fn set_bus_effect(
        &mut self,
        address: BusAddress,
        slot: usize,
        storage: ProcessorStorage,
    ) -> bool {
        let sample_rate = self.sample_rate;
        match self.patch.busses.bus_mut(address) {
            Some(bus) => {
                bus.update_effect_params(slot, storage)
                    || bus.set_effect(slot, storage, &mut self.pool, sample_rate)
            }
            None => false,
        }
    }

    pub fn bus_effect_storage(&self, address: BusAddress, slot: usize) -> Option<ProcessorStorage> {
        self.patch.busses.bus(address)?.effect_storage(slot).copied()
    }

    pub fn processor_storage(&self, address: ProcessorAddress) -> Option<ProcessorStorage> {
        if address.slot >= PROCESSORS_PER_ZONE {
            return None;
        }
        let zone = self.zone(ZonePath::new(address.part, address.group, address.zone))?;
        Some(zone.processor_storage[address.slot])
    }

    /// Flattened part/group/zone tree. `-1` marks the levels an entry does not
    /// reach. Allocates; call it from the control side.
    pub fn part_group_zone_structure(&self, part_filter: Option<usize>) -> Vec<StructureEntry> {
        let mut res = Vec::new();
        for (pi, part) in self.patch.parts.iter().enumerate() {
            if part_filter.is_some_and(|f| f != pi) {
                continue;
            }
            res.push(StructureEntry::part(pi, format!("Part {}", pi + 1)));
            for (gi, group) in part.groups().iter().enumerate() {
                res.push(StructureEntry::group(pi, gi, group.name.clone()));
                for (zi, zone) in group.zones().iter().enumerate() {
                    res.push(StructureEntry::zone(pi, gi, zi, zone.name.clone()));
                }
            }
        }
        res
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.all_sound_off();
        self.patch.busses.release_effects(&mut self.pool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::keyboard::KeyboardRange;
    use crate::sample::{Sample, SampleManager};

    fn engine_with_zone(keys: KeyboardRange) -> Engine {
        let (mut engine, _controller) = Engine::new(EngineConfig::default());
        let mut manager = SampleManager::new();
        let id = manager.add_sample(
            Sample::from_f32("tone", 48_000.0, vec![vec![0.3; 48_000]]).unwrap(),
        );
        let mut zone = Zone::with_sample(id);
        assert!(zone.attach_to_sample(&manager, 0));
        zone.mapping.keyboard_range = keys;
        let part = engine.patch_mut().part_mut(0).unwrap();
        let g = part.add_group(Box::new(Group::new("g")));
        part.group_mut(g).unwrap().add_zone(Box::new(zone));
        engine
    }

    #[test]
    fn test_note_on_outside_mapping_starts_nothing() {
        let mut engine = engine_with_zone(KeyboardRange::new(60, 60));
        engine.note_on(0, 61, -1, 127);
        engine.process_audio();
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn test_note_on_other_channel_is_ignored() {
        let mut engine = engine_with_zone(KeyboardRange::new(60, 60));
        engine.note_on(5, 60, -1, 127);
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn test_wildcard_note_off_skips_release_zones() {
        let mut engine = engine_with_zone(KeyboardRange::new(0, 0));
        engine.zone_mut(ZonePath::new(0, 0, 0)).unwrap().sample_data[0].play_mode = PlayMode::OnRelease;

        engine.note_off(0, -1, -1, 0);
        assert_eq!(engine.active_voice_count(), 0);

        engine.note_off(0, 0, -1, 0);
        assert_eq!(engine.active_voice_count(), 1);
    }

    #[test]
    fn test_pool_exhaustion_drops_notes() {
        let mut engine = engine_with_zone(KeyboardRange::default());
        for i in 0..(MAX_VOICES + 10) {
            engine.note_on(0, (i % 128) as i16, i as i32, 100);
        }
        assert_eq!(engine.active_voice_count() as usize, MAX_VOICES);
        assert_eq!(engine.ui_state().dropped_note_count(), 10);
        engine.process_audio();
        assert!(engine.output().iter().flatten().all(|s| s.is_finite()));
    }

    #[test]
    fn test_remove_zone_stops_its_voices() {
        let mut engine = engine_with_zone(KeyboardRange::default());
        engine.note_on(0, 60, -1, 127);
        engine.process_audio();
        assert_eq!(engine.active_voice_count(), 1);
        let removed = engine.remove_zone(ZonePath::new(0, 0, 0)).unwrap();
        assert!(!removed.is_active());
        assert_eq!(engine.active_voice_count(), 0);
        assert!(!engine.patch().part(0).unwrap().group(0).unwrap().is_active());
        assert!(engine.remove_zone(ZonePath::new(0, 0, 0)).is_none());
    }

    #[test]
    fn test_structure_lists_every_level() {
        let engine = engine_with_zone(KeyboardRange::default());
        let s = engine.part_group_zone_structure(Some(0));
        assert_eq!(s.len(), 3);
        assert_eq!(s[2].address, (0, 0, 0));
        assert_eq!(s[1].address, (0, 0, -1));
        assert_eq!(engine.part_group_zone_structure(None).len(), 2 + crate::NUM_PARTS);
    }

    #[test]
    fn test_processor_storage_lookup() {
        let engine = engine_with_zone(KeyboardRange::default());
        let addr = ProcessorAddress {
            part: 0,
            group: 0,
            zone: 0,
            slot: 0,
        };
        assert!(engine.processor_storage(addr).is_some());
        assert!(engine
            .processor_storage(ProcessorAddress { slot: 9, ..addr })
            .is_none());
        assert!(engine
            .processor_storage(ProcessorAddress { zone: 3, ..addr })
            .is_none());
    }
}
