//! Shared fixtures for app integration tests.

use std::collections::VecDeque;
use std::time::Duration;

use veil_app::config::LockConfig;
use veil_app::display::{DisplayError, DisplayServer, GrabStatus, LockEvent, OutputInfo};
use veil_app::grab::Sleeper;
use veil_auth::{AuthError, AuthStateMachine, CredentialHash, PasswordVerifier};
use veil_capture::{CaptureBackend, SyntheticCaptureBackend};
use veil_core::{Frame, OutputRegion};
use veil_ui::LabelRun;

/// Window handle used by [`FakeDisplay`]; output `i` gets `WINDOW_BASE + i`.
#[allow(dead_code)]
pub const WINDOW_BASE: u32 = 100;

/// One recorded call to `present`.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Presented {
    pub window: u32,
    pub width: u32,
    pub height: u32,
    pub labels: Vec<String>,
}

/// Scripted grab responses for one output.
#[derive(Debug, Clone)]
struct GrabScript {
    queued: VecDeque<GrabStatus>,
    fallback: GrabStatus,
}

impl GrabScript {
    fn next(&mut self) -> GrabStatus {
        self.queued.pop_front().unwrap_or(self.fallback)
    }
}

/// In-memory display server recording every request.
#[allow(dead_code)]
#[derive(Debug)]
pub struct FakeDisplay {
    outputs: Vec<OutputInfo>,
    pointer: Vec<GrabScript>,
    keyboard: Vec<GrabScript>,
    events: VecDeque<LockEvent<u32>>,
    pub created: Vec<u32>,
    pub pointer_requests: Vec<usize>,
    pub keyboard_requests: Vec<usize>,
    pub mapped: Vec<u32>,
    pub watched_outputs: Vec<u32>,
    pub watched_roots: Vec<usize>,
    pub resizes: Vec<(u32, u32, u32)>,
    pub presents: Vec<Presented>,
    pub raises: Vec<u32>,
    pub bells: Vec<i8>,
    pub flushes: usize,
    pub syncs: usize,
}

#[allow(dead_code)]
impl FakeDisplay {
    /// Creates `count` outputs of `width x height` placed side by side.
    pub fn with_outputs(count: usize, width: u32, height: u32) -> Self {
        let outputs = (0..count)
            .map(|index| OutputInfo {
                index,
                region: OutputRegion {
                    x: (index as u32 * width) as i32,
                    y: 0,
                    width,
                    height,
                },
            })
            .collect();
        let success = GrabScript {
            queued: VecDeque::new(),
            fallback: GrabStatus::Success,
        };

        Self {
            outputs,
            pointer: vec![success.clone(); count],
            keyboard: vec![success; count],
            events: VecDeque::new(),
            created: Vec::new(),
            pointer_requests: vec![0; count],
            keyboard_requests: vec![0; count],
            mapped: Vec::new(),
            watched_outputs: Vec::new(),
            watched_roots: Vec::new(),
            resizes: Vec::new(),
            presents: Vec::new(),
            raises: Vec::new(),
            bells: Vec::new(),
            flushes: 0,
            syncs: 0,
        }
    }

    /// Queues pointer grab replies for `output`, then answers `fallback`.
    pub fn script_pointer(&mut self, output: usize, queued: &[GrabStatus], fallback: GrabStatus) {
        self.pointer[output] = GrabScript {
            queued: queued.iter().copied().collect(),
            fallback,
        };
    }

    /// Queues keyboard grab replies for `output`, then answers `fallback`.
    pub fn script_keyboard(&mut self, output: usize, queued: &[GrabStatus], fallback: GrabStatus) {
        self.keyboard[output] = GrabScript {
            queued: queued.iter().copied().collect(),
            fallback,
        };
    }

    /// Appends events delivered by `next_event`; an empty queue is a lost connection.
    pub fn push_events(&mut self, events: impl IntoIterator<Item = LockEvent<u32>>) {
        self.events.extend(events);
    }

    /// Output description by index.
    pub fn output(&self, index: usize) -> OutputInfo {
        self.outputs[index]
    }

    /// Window that covers output `index`.
    pub fn window_for(index: usize) -> u32 {
        WINDOW_BASE + index as u32
    }
}

impl DisplayServer for FakeDisplay {
    type Window = u32;

    fn outputs(&self) -> Result<Vec<OutputInfo>, DisplayError> {
        Ok(self.outputs.clone())
    }

    fn create_covering_window(&mut self, output: &OutputInfo) -> Result<u32, DisplayError> {
        let window = Self::window_for(output.index);
        self.created.push(window);
        Ok(window)
    }

    fn grab_pointer(&mut self, output: &OutputInfo, _window: u32) -> Result<GrabStatus, DisplayError> {
        self.pointer_requests[output.index] += 1;
        Ok(self.pointer[output.index].next())
    }

    fn grab_keyboard(&mut self, output: &OutputInfo, _window: u32) -> Result<GrabStatus, DisplayError> {
        self.keyboard_requests[output.index] += 1;
        Ok(self.keyboard[output.index].next())
    }

    fn map_raised(&mut self, window: u32) -> Result<(), DisplayError> {
        self.mapped.push(window);
        Ok(())
    }

    fn watch_output_changes(&mut self, window: u32) -> Result<bool, DisplayError> {
        self.watched_outputs.push(window);
        Ok(true)
    }

    fn watch_substructure(&mut self, output: &OutputInfo) -> Result<(), DisplayError> {
        self.watched_roots.push(output.index);
        Ok(())
    }

    fn resize(&mut self, window: u32, width: u32, height: u32) -> Result<(), DisplayError> {
        self.resizes.push((window, width, height));
        Ok(())
    }

    fn present(&mut self, window: u32, surface: &Frame, labels: &[LabelRun]) -> Result<(), DisplayError> {
        self.presents.push(Presented {
            window,
            width: surface.width(),
            height: surface.height(),
            labels: labels.iter().map(|label| label.text.clone()).collect(),
        });
        Ok(())
    }

    fn raise(&mut self, window: u32) -> Result<(), DisplayError> {
        self.raises.push(window);
        Ok(())
    }

    fn bell(&mut self, percent: i8) -> Result<(), DisplayError> {
        self.bells.push(percent);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.flushes += 1;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DisplayError> {
        self.syncs += 1;
        Ok(())
    }

    fn next_event(&mut self) -> Result<LockEvent<u32>, DisplayError> {
        self.events
            .pop_front()
            .ok_or_else(|| DisplayError::Connection("event queue exhausted".to_string()))
    }
}

/// Records requested sleeps instead of sleeping.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FakeSleeper {
    pub slept: Vec<Duration>,
}

impl Sleeper for FakeSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
    }
}

/// Accepts exactly one password.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct FakeVerifier {
    pub expected: Vec<u8>,
}

impl PasswordVerifier for FakeVerifier {
    fn verify(&self, candidate: &[u8], _hash: &CredentialHash) -> Result<bool, AuthError> {
        Ok(candidate == self.expected.as_slice())
    }
}

/// State machine accepting `password`.
#[allow(dead_code)]
pub fn machine_accepting(password: &str) -> AuthStateMachine<FakeVerifier> {
    AuthStateMachine::new(
        FakeVerifier {
            expected: password.as_bytes().to_vec(),
        },
        CredentialHash::new("$6$fixture$unused"),
    )
}

/// Synthetic desktop wide enough for `outputs` outputs of `width x height`.
#[allow(dead_code)]
pub fn desktop(outputs: usize, width: u32, height: u32) -> Frame {
    SyntheticCaptureBackend::new(width * outputs as u32, height)
        .capture_desktop()
        .expect("synthetic capture should work")
}

/// Config with default values.
#[allow(dead_code)]
pub fn default_config() -> LockConfig {
    LockConfig::default()
}

/// Keysym events typing `text`.
#[allow(dead_code)]
pub fn type_text(text: &str) -> Vec<LockEvent<u32>> {
    text.chars().map(|ch| LockEvent::Key(u32::from(ch))).collect()
}
