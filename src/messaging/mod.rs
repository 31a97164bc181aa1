//! Control thread ↔ audio thread protocol.
//!
//! The control thread owns a [`MessageController`]. It never touches the
//! engine directly: every edit travels to the audio thread as a callback over
//! a lock-free SPSC queue and comes back as a completion message, so any
//! memory the edit releases is freed on the control thread.

/*
Message Flow
============

    control thread                                   audio thread
    ──────────────                                   ────────────
    MessageController                                Engine::process_audio
      │  Dispatch(cb)                                  │
      ├────────── ControlToAudio (rtrb) ──────────────▶├─ cb.exec(&mut engine)
      │  DispatchUnderStructureLock(cb)                │   (try_lock, parked when held)
      │  Midi / StopEngine / RestartEngine             │
      │                                                │
      │◀───────── AudioToControl (rtrb) ───────────────┤
      │  CallbackComplete(cb)   cb dropped here,       │
      │                         on_complete runs here  │
      │  StructureRefresh       structure → client     │
      │  VoiceCountChanged                             │
      ▼
    ClientMessage (structure, voice count, errors) for whatever UI is attached


Structure Mirror
----------------

The controller keeps a copy of the part/group/zone names. It is updated as
edits are queued, and queued edits apply in order, so index lookups made on
the control thread agree with what the audio thread will see. A lookup that
misses fails the request before anything is queued.
*/

use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use parking_lot::Mutex;
use rtrb::{Consumer, Producer};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::engine::bus::{BusAddress, MAX_BUS_EFFECTS};
use crate::engine::group::Group;
use crate::engine::keyboard::{KeyboardRange, VelocityRange};
use crate::engine::ui_state::SharedUiState;
use crate::engine::zone::Zone;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::processor::ProcessorStorage;
use crate::sample::{SampleId, SampleManager};
use crate::voice::ZonePath;
use crate::NUM_PARTS;

pub type EngineCallback = Box<dyn FnMut(&mut Engine) + Send>;
pub type CompletionCallback = Box<dyn FnOnce(&mut MessageController) + Send>;

/// A unit of work for the audio thread.
///
/// `exec` runs once on the audio thread. The whole callback, including
/// anything `exec` left in its captures, is sent back and dropped on the
/// control thread, after which `on_complete` runs there.
pub struct AudioThreadCallback {
    pub(crate) exec: EngineCallback,
    on_complete: Option<CompletionCallback>,
}

impl AudioThreadCallback {
    pub fn new(exec: EngineCallback, on_complete: Option<CompletionCallback>) -> Self {
        Self { exec, on_complete }
    }

    /// Wrap a one-shot closure. The closure itself is kept in the boxed
    /// state, so calling it does not free anything on the audio thread.
    pub fn once<F>(f: F, on_complete: Option<CompletionCallback>) -> Self
    where
        F: FnOnce(&mut Engine) + Send + 'static,
    {
        let mut f = Some(f);
        Self::new(
            Box::new(move |engine| {
                if let Some(f) = f.take() {
                    f(engine);
                }
            }),
            on_complete,
        )
    }
}

/// MIDI as the engine consumes it. Channel `-1` addresses every part.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn {
        channel: i16,
        key: i16,
        note_id: i32,
        velocity: i16,
    },
    NoteOff {
        channel: i16,
        key: i16,
        note_id: i32,
        velocity: i16,
    },
    /// -8192..8191
    PitchBend { channel: i16, value: i16 },
    ControlChange {
        channel: i16,
        controller: i16,
        value: i16,
    },
    ChannelAftertouch { channel: i16, value: i16 },
    PolyAftertouch { channel: i16, key: i16, value: i16 },
}

pub enum ControlToAudio {
    Dispatch(AudioThreadCallback),
    DispatchUnderStructureLock(AudioThreadCallback),
    Midi(MidiEvent),
    /// Stop rendering (silence) while still draining messages. Nests.
    StopEngine,
    RestartEngine,
}

pub enum AudioToControl {
    CallbackComplete(AudioThreadCallback),
    StructureRefresh,
    VoiceCountChanged(u32),
}

/// One row of the flattened part/group/zone tree. Levels below the entry are `-1`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureEntry {
    pub address: (i32, i32, i32),
    pub name: String,
}

impl StructureEntry {
    pub fn part(part: usize, name: String) -> Self {
        Self {
            address: (part as i32, -1, -1),
            name,
        }
    }

    pub fn group(part: usize, group: usize, name: String) -> Self {
        Self {
            address: (part as i32, group as i32, -1),
            name,
        }
    }

    pub fn zone(part: usize, group: usize, zone: usize, name: String) -> Self {
        Self {
            address: (part as i32, group as i32, zone as i32),
            name,
        }
    }
}

/// Notifications for whatever client (UI, CLI) sits on the control thread.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Structure(Vec<StructureEntry>),
    VoiceCount(u32),
    Error { title: String, message: String },
}

#[derive(Debug, Clone, Default)]
struct GroupMirror {
    name: String,
    zones: Vec<String>,
}

pub struct MessageController {
    config: EngineConfig,
    to_audio: Producer<ControlToAudio>,
    from_audio: Consumer<AudioToControl>,
    structure_lock: Arc<Mutex<()>>,
    ui_state: Arc<SharedUiState>,
    samples: SampleManager,
    parts: Vec<Vec<GroupMirror>>,
    client_messages: Vec<ClientMessage>,
    callbacks_completed: u64,
}

impl MessageController {
    pub(crate) fn new(
        config: EngineConfig,
        to_audio: Producer<ControlToAudio>,
        from_audio: Consumer<AudioToControl>,
        structure_lock: Arc<Mutex<()>>,
        ui_state: Arc<SharedUiState>,
    ) -> Self {
        Self {
            config,
            to_audio,
            from_audio,
            structure_lock,
            ui_state,
            samples: SampleManager::new(),
            parts: vec![Vec::new(); NUM_PARTS],
            client_messages: Vec::new(),
            callbacks_completed: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn samples(&self) -> &SampleManager {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut SampleManager {
        &mut self.samples
    }

    pub fn ui_state(&self) -> &Arc<SharedUiState> {
        &self.ui_state
    }

    /// Callbacks the audio thread has finished and handed back.
    pub fn callbacks_completed(&self) -> u64 {
        self.callbacks_completed
    }

    /// The lock structural callbacks run under. While a caller holds it the
    /// audio thread parks those callbacks (without blocking) until it is free.
    pub fn structure_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.structure_lock)
    }

    fn push(&mut self, msg: ControlToAudio) -> Result<(), EngineError> {
        self.to_audio.push(msg).map_err(|_| {
            warn!("audio message queue full");
            EngineError::QueueFull
        })
    }

    /// Run `f` on the audio thread at the start of the next block. For
    /// edits that do not add or remove containers.
    pub fn schedule_audio_thread_callback<F>(&mut self, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Engine) + Send + 'static,
    {
        self.push(ControlToAudio::Dispatch(AudioThreadCallback::once(f, None)))
    }

    pub fn schedule_audio_thread_callback_with_completion<F, C>(
        &mut self,
        f: F,
        on_complete: C,
    ) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Engine) + Send + 'static,
        C: FnOnce(&mut MessageController) + Send + 'static,
    {
        self.push(ControlToAudio::Dispatch(AudioThreadCallback::once(
            f,
            Some(Box::new(on_complete)),
        )))
    }

    /// Run a structural edit on the audio thread while it holds the
    /// structure lock.
    pub fn schedule_audio_thread_callback_under_structure_lock(
        &mut self,
        callback: AudioThreadCallback,
    ) -> Result<(), EngineError> {
        self.push(ControlToAudio::DispatchUnderStructureLock(callback))
    }

    pub fn send_midi(&mut self, event: MidiEvent) -> Result<(), EngineError> {
        self.push(ControlToAudio::Midi(event))
    }

    pub fn note_on(&mut self, channel: i16, key: i16, velocity: i16) -> Result<(), EngineError> {
        self.send_midi(MidiEvent::NoteOn {
            channel,
            key,
            note_id: -1,
            velocity,
        })
    }

    pub fn note_off(&mut self, channel: i16, key: i16) -> Result<(), EngineError> {
        self.send_midi(MidiEvent::NoteOff {
            channel,
            key,
            note_id: -1,
            velocity: 0,
        })
    }

    /// The engine keeps draining messages but renders silence until restarted.
    pub fn stop_audio_thread(&mut self) -> Result<(), EngineError> {
        self.push(ControlToAudio::StopEngine)
    }

    pub fn restart_audio_thread(&mut self) -> Result<(), EngineError> {
        self.push(ControlToAudio::RestartEngine)
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<(), EngineError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            error!(sample_rate, "invalid sample rate");
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        self.config.sample_rate = sample_rate;
        self.schedule_audio_thread_callback(move |e| e.set_sample_rate(sample_rate))
    }

    fn check_part(&self, part: usize) -> Result<&[GroupMirror], EngineError> {
        self.parts.get(part).map(Vec::as_slice).ok_or_else(|| {
            error!(part, "no such part");
            EngineError::NoSuchPart(part)
        })
    }

    fn check_group(&self, part: usize, group: usize) -> Result<&GroupMirror, EngineError> {
        self.check_part(part)?.get(group).ok_or_else(|| {
            error!(part, group, "no such group");
            EngineError::NoSuchGroup { part, group }
        })
    }

    fn check_zone(&self, path: ZonePath) -> Result<(), EngineError> {
        let ZonePath { part, group, zone } = path;
        if zone < self.check_group(part, group)?.zones.len() {
            Ok(())
        } else {
            error!(part, group, zone, "no such zone");
            Err(EngineError::NoSuchZone { part, group, zone })
        }
    }

    /// Append a new group to a part. Returns the index it will have.
    pub fn add_group(&mut self, part: usize, name: &str) -> Result<usize, EngineError> {
        let index = self.check_part(part)?.len();
        let mut staged = Some(Box::new(Group::new(name)));
        let exec: EngineCallback = Box::new(move |e| {
            let sample_rate = e.sample_rate();
            let Some(p) = e.patch_mut().part_mut(part) else {
                return;
            };
            if let Some(mut group) = staged.take() {
                group.set_sample_rate(sample_rate);
                p.add_group(group);
            }
            e.send_structure_refresh();
        });
        self.schedule_audio_thread_callback_under_structure_lock(AudioThreadCallback::new(
            exec, None,
        ))?;
        self.parts[part].push(GroupMirror {
            name: name.to_owned(),
            zones: Vec::new(),
        });
        debug!(part, group = index, name, "group queued");
        Ok(index)
    }

    /// Append a zone to a group. Returns its path.
    pub fn add_zone(&mut self, part: usize, group: usize, zone: Zone) -> Result<ZonePath, EngineError> {
        let index = self.check_group(part, group)?.zones.len();
        let name = zone.name.clone();
        let mut staged = Some(Box::new(zone));
        let exec: EngineCallback = Box::new(move |e| {
            let Some(g) = e.patch_mut().part_mut(part).and_then(|p| p.group_mut(group)) else {
                return;
            };
            if let Some(zone) = staged.take() {
                g.add_zone(zone);
            }
            e.send_structure_refresh();
        });
        self.schedule_audio_thread_callback_under_structure_lock(AudioThreadCallback::new(
            exec, None,
        ))?;
        self.parts[part][group].zones.push(name);
        Ok(ZonePath::new(part, group, index))
    }

    /// Load a sample file on this thread, build a zone for it and add the zone
    /// to `group`, creating groups up to that index if needed. Failures are
    /// also reported to the client.
    pub fn load_sample_into(
        &mut self,
        path: &Path,
        part: usize,
        group: usize,
        root_key: i16,
        key_range: KeyboardRange,
        velocity_range: VelocityRange,
    ) -> Result<ZonePath, EngineError> {
        self.check_part(part)?;
        let id = match self.samples.load_sample_by_path(path) {
            Ok(id) => id,
            Err(err) => {
                error!(path = %path.display(), %err, "sample load failed");
                self.report_error_to_client(
                    "Unable to load sample",
                    &format!(
                        "Sample load failed:\n\n{}\n\n{}\n{}",
                        path.display(),
                        err,
                        err.guidance()
                    ),
                );
                return Err(err.into());
            }
        };

        let mut zone = Zone::with_sample(id);
        zone.attach_to_sample(&self.samples, 0);
        zone.mapping.root_key = root_key;
        zone.mapping.keyboard_range = key_range;
        zone.mapping.velocity_range = velocity_range;

        let added = self.ensure_group(part, group).and_then(|()| self.add_zone(part, group, zone));
        let zone_path = match added {
            Ok(zone_path) => zone_path,
            Err(err) => {
                self.samples.remove_sample(id);
                return Err(err);
            }
        };
        info!(path = %path.display(), sample = id.0, ?zone_path, "sample loaded into zone");
        Ok(zone_path)
    }

    fn ensure_group(&mut self, part: usize, group: usize) -> Result<(), EngineError> {
        while self.parts[part].len() <= group {
            let n = self.parts[part].len();
            self.add_group(part, &format!("Group {}", n + 1))?;
        }
        Ok(())
    }

    /// Add an already-loaded sample as a new zone.
    pub fn add_sample_zone(
        &mut self,
        sample: SampleId,
        part: usize,
        group: usize,
    ) -> Result<ZonePath, EngineError> {
        let mut zone = Zone::with_sample(sample);
        zone.attach_to_sample(&self.samples, 0);
        self.add_zone(part, group, zone)
    }

    /// Remove a zone. Its voices stop at the start of the next block.
    pub fn remove_zone(&mut self, path: ZonePath) -> Result<(), EngineError> {
        self.check_zone(path)?;
        // Reserved up front so the push on the audio thread does not allocate.
        let mut removed: Vec<Box<Zone>> = Vec::with_capacity(1);
        let exec: EngineCallback = Box::new(move |e| {
            if let Some(zone) = e.remove_zone(path) {
                removed.push(zone);
            }
            e.send_structure_refresh();
        });
        let on_complete: CompletionCallback = Box::new(|c| {
            let purged = c.samples.purge_unreferenced();
            debug!(purged, "zone removed");
        });
        self.schedule_audio_thread_callback_under_structure_lock(AudioThreadCallback::new(
            exec,
            Some(on_complete),
        ))?;
        self.parts[path.part][path.group].zones.remove(path.zone);
        Ok(())
    }

    pub fn remove_group(&mut self, part: usize, group: usize) -> Result<(), EngineError> {
        self.check_group(part, group)?;
        let mut removed: Vec<Box<Group>> = Vec::with_capacity(1);
        let exec: EngineCallback = Box::new(move |e| {
            if let Some(g) = e.remove_group(part, group) {
                removed.push(g);
            }
            e.send_structure_refresh();
        });
        let on_complete: CompletionCallback = Box::new(|c| {
            c.samples.purge_unreferenced();
        });
        self.schedule_audio_thread_callback_under_structure_lock(AudioThreadCallback::new(
            exec,
            Some(on_complete),
        ))?;
        self.parts[part].remove(group);
        Ok(())
    }

    /// Edit zone data in place (mapping, envelopes, routing, processor
    /// settings). Runs without the structure lock.
    pub fn update_zone<F>(&mut self, path: ZonePath, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Zone) + Send + 'static,
    {
        self.check_zone(path)?;
        self.schedule_audio_thread_callback(move |e| {
            if let Some(zone) = e.zone_mut(path) {
                f(zone);
            }
        })
    }

    pub fn update_group<F>(&mut self, part: usize, group: usize, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Group) + Send + 'static,
    {
        self.check_group(part, group)?;
        self.schedule_audio_thread_callback(move |e| {
            if let Some(g) = e.patch_mut().part_mut(part).and_then(|p| p.group_mut(group)) {
                f(g);
            }
        })
    }

    pub fn rename_zone(&mut self, path: ZonePath, name: &str) -> Result<(), EngineError> {
        self.check_zone(path)?;
        self.parts[path.part][path.group].zones[path.zone] = name.to_owned();
        let mut staged = Some(name.to_owned());
        let exec: EngineCallback = Box::new(move |e| {
            if let (Some(zone), Some(name)) = (e.zone_mut(path), staged.as_mut()) {
                std::mem::swap(&mut zone.name, name);
            }
        });
        self.push(ControlToAudio::Dispatch(AudioThreadCallback::new(exec, None)))
    }

    pub fn set_bus_effect(
        &mut self,
        address: BusAddress,
        slot: usize,
        storage: ProcessorStorage,
    ) -> Result<(), EngineError> {
        if address.index().is_none() {
            return Err(EngineError::NoSuchBus(address));
        }
        if slot >= MAX_BUS_EFFECTS {
            return Err(EngineError::SlotOutOfRange {
                slot,
                max: MAX_BUS_EFFECTS,
            });
        }
        self.schedule_audio_thread_callback(move |e| {
            e.set_bus_effect(address, slot, storage);
        })
    }

    /// Current mirror of the part/group/zone tree, in the same shape as
    /// [`Engine::part_group_zone_structure`].
    pub fn structure(&self) -> Vec<StructureEntry> {
        let mut res = Vec::new();
        for (pi, groups) in self.parts.iter().enumerate() {
            res.push(StructureEntry::part(pi, format!("Part {}", pi + 1)));
            for (gi, g) in groups.iter().enumerate() {
                res.push(StructureEntry::group(pi, gi, g.name.clone()));
                for (zi, name) in g.zones.iter().enumerate() {
                    res.push(StructureEntry::zone(pi, gi, zi, name.clone()));
                }
            }
        }
        res
    }

    pub fn report_error_to_client(&mut self, title: &str, message: &str) {
        self.client_messages.push(ClientMessage::Error {
            title: title.to_owned(),
            message: message.to_owned(),
        });
    }

    /// Take everything queued for the client so far.
    pub fn drain_client_messages(&mut self) -> std::vec::Drain<'_, ClientMessage> {
        self.client_messages.drain(..)
    }

    /// Handle everything the audio thread has sent back. Returns the number of
    /// messages handled.
    pub fn process_audio_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.from_audio.pop() {
            handled += 1;
            match msg {
                AudioToControl::CallbackComplete(cb) => {
                    let AudioThreadCallback { exec, on_complete } = cb;
                    drop(exec);
                    self.callbacks_completed += 1;
                    if let Some(done) = on_complete {
                        done(self);
                    }
                }
                AudioToControl::StructureRefresh => {
                    let structure = self.structure();
                    self.client_messages.push(ClientMessage::Structure(structure));
                }
                AudioToControl::VoiceCountChanged(count) => {
                    self.client_messages.push(ClientMessage::VoiceCount(count));
                }
            }
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;

    fn pair() -> (Engine, MessageController) {
        Engine::new(EngineConfig::default())
    }

    #[test]
    fn test_callback_runs_next_block_and_completes() {
        let (mut engine, mut c) = pair();
        c.schedule_audio_thread_callback_with_completion(
            |e| e.set_sample_rate(44_100.0),
            |c| c.report_error_to_client("done", ""),
        )
        .unwrap();
        assert_eq!(engine.sample_rate(), 48_000.0);
        engine.process_audio();
        assert_eq!(engine.sample_rate(), 44_100.0);
        assert_eq!(c.process_audio_messages(), 1);
        assert_eq!(c.callbacks_completed(), 1);
        let msgs: Vec<_> = c.drain_client_messages().collect();
        assert!(matches!(&msgs[0], ClientMessage::Error { title, .. } if title == "done"));
    }

    #[test]
    fn test_lookups_fail_before_queueing() {
        let (_engine, mut c) = pair();
        assert!(matches!(
            c.remove_zone(ZonePath::new(0, 0, 0)),
            Err(EngineError::NoSuchGroup { part: 0, group: 0 })
        ));
        assert!(matches!(c.add_group(NUM_PARTS, "x"), Err(EngineError::NoSuchPart(_))));
        c.add_group(0, "g").unwrap();
        assert!(matches!(
            c.update_zone(ZonePath::new(0, 0, 2), |_| {}),
            Err(EngineError::NoSuchZone { zone: 2, .. })
        ));
        assert!(matches!(
            c.set_bus_effect(BusAddress::Default, 0, ProcessorStorage::default()),
            Err(EngineError::NoSuchBus(_))
        ));
    }

    #[test]
    fn test_structure_mirror_tracks_edits() {
        let (mut engine, mut c) = pair();
        let id = c
            .samples_mut()
            .add_sample(Sample::from_f32("kick", 48_000.0, vec![vec![0.1; 64]]).unwrap());
        c.add_group(1, "drums").unwrap();
        let path = c.add_sample_zone(id, 1, 0).unwrap();
        assert_eq!(path, ZonePath::new(1, 0, 0));
        engine.process_audio();
        c.process_audio_messages();
        assert_eq!(c.structure(), engine.part_group_zone_structure(None));

        c.remove_zone(path).unwrap();
        engine.process_audio();
        c.process_audio_messages();
        assert_eq!(c.structure(), engine.part_group_zone_structure(None));
        assert!(c.samples().is_empty(), "unreferenced sample purged");
        let refreshed = c
            .drain_client_messages()
            .filter(|m| matches!(m, ClientMessage::Structure(_)))
            .count();
        assert_eq!(refreshed, 3);
    }

    #[test]
    fn test_missing_file_reports_error() {
        let (_engine, mut c) = pair();
        let dir = tempfile::tempdir().unwrap();
        let res = c.load_sample_into(
            &dir.path().join("missing.wav"),
            0,
            0,
            60,
            KeyboardRange::default(),
            VelocityRange::default(),
        );
        assert!(matches!(res, Err(EngineError::Sample(_))));
        let msgs: Vec<_> = c.drain_client_messages().collect();
        assert!(matches!(
            &msgs[..],
            [ClientMessage::Error { message, .. }] if message.contains("missing.wav")
        ));
        assert!(c.structure().iter().all(|e| e.address.1 == -1), "no group created");
    }

    #[test]
    fn test_failed_zone_add_releases_loaded_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..256 {
            writer.write_sample((i as f32 * 0.05).sin()).unwrap();
        }
        writer.finalize().unwrap();

        let (_engine, mut c) = Engine::new(EngineConfig {
            message_queue_capacity: 2,
            ..EngineConfig::default()
        });
        c.add_group(0, "g").unwrap();
        c.note_on(0, 60, 100).unwrap();
        let res = c.load_sample_into(
            &path,
            0,
            0,
            60,
            KeyboardRange::default(),
            VelocityRange::default(),
        );
        assert!(matches!(res, Err(EngineError::QueueFull)));
        assert!(c.samples().is_empty());
        assert!(c.structure().iter().all(|e| e.address.2 == -1), "no zone mirrored");
    }

    #[test]
    fn test_queue_full_is_reported() {
        let config = EngineConfig {
            message_queue_capacity: 2,
            ..EngineConfig::default()
        };
        let (_engine, mut c) = Engine::new(config);
        c.note_on(0, 60, 100).unwrap();
        c.note_on(0, 61, 100).unwrap();
        assert!(matches!(c.note_on(0, 62, 100), Err(EngineError::QueueFull)));
    }
}
