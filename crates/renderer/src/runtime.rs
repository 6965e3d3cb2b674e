use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

/// High-level behaviour requested by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Render continuously, one frame per display refresh.
    Animate,
    /// Render on demand at a fixed timestamp (seconds).
    Still { time: f32 },
    /// Render a single frame offscreen at `time` and write it to `path` as PNG.
    Export { time: f32, path: PathBuf },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate
    }
}

/// Snapshot of the time state handed to scenes and the compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds of wall-clock time since the first frame (or a fixed timestamp).
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
///
/// The clock starts on the first sample, so frame 0 always sees `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource {
    origin: Option<Instant>,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        let origin = *self.origin.get_or_insert_with(Instant::now);
        let sample = TimeSample::new(origin.elapsed().as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
    frame: u64,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self { time, frame: 0 }
    }
}

impl TimeSource for FixedTimeSource {
    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.time, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds a time source suited to the requested render policy.
pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time } | RenderPolicy::Export { time, .. } => {
            Box::new(FixedTimeSource::new(*time))
        }
    }
}

/// Renders every scene slot, in order, into its own target.
pub trait SceneRender {
    fn render_scenes(&mut self, seconds: f32) -> Result<()>;
}

/// Applies the effect chain to the rendered scenes and writes the output.
pub trait CompositeDraw {
    fn draw(&mut self, seconds: f32) -> Result<()>;
}

/// Advances time and sequences one frame: all scenes, then the compositor.
///
/// Each tick samples the time source exactly once and hands the same value to
/// both stages. Samples are clamped so time never runs backwards.
pub struct FrameDriver {
    time_source: BoxedTimeSource,
    last: Option<TimeSample>,
}

impl FrameDriver {
    pub fn new(time_source: BoxedTimeSource) -> Self {
        Self {
            time_source,
            last: None,
        }
    }

    pub fn for_policy(policy: &RenderPolicy) -> Self {
        Self::new(time_source_for_policy(policy))
    }

    /// Runs one frame. Errors from either stage are returned untouched and
    /// nothing is retried.
    pub fn tick<S, C>(&mut self, scenes: &mut S, compositor: &mut C) -> Result<TimeSample>
    where
        S: SceneRender + ?Sized,
        C: CompositeDraw + ?Sized,
    {
        let sample = self.advance();
        scenes.render_scenes(sample.seconds)?;
        compositor.draw(sample.seconds)?;
        Ok(sample)
    }

    fn advance(&mut self) -> TimeSample {
        let mut sample = self.time_source.sample();
        if let Some(previous) = self.last {
            sample.seconds = sample.seconds.max(previous.seconds);
        }
        self.last = Some(sample);
        sample
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::types::CompositorInputs;

    struct ScriptedTimeSource {
        values: Vec<f32>,
        index: usize,
    }

    impl ScriptedTimeSource {
        fn boxed(values: &[f32]) -> BoxedTimeSource {
            Box::new(Self {
                values: values.to_vec(),
                index: 0,
            })
        }
    }

    impl TimeSource for ScriptedTimeSource {
        fn sample(&mut self) -> TimeSample {
            let value = self.values[self.index.min(self.values.len() - 1)];
            let sample = TimeSample::new(value, self.index as u64);
            self.index += 1;
            sample
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        Write { texture: u32, seconds: f32 },
        Draw { primary: u32, channels: [u32; 2], seconds: f32 },
    }

    type Log = Rc<RefCell<Vec<Call>>>;

    struct FakeScenes {
        textures: Vec<u32>,
        log: Log,
    }

    impl SceneRender for FakeScenes {
        fn render_scenes(&mut self, seconds: f32) -> Result<()> {
            for &texture in &self.textures {
                self.log.borrow_mut().push(Call::Write { texture, seconds });
            }
            Ok(())
        }
    }

    struct FakeCompositor {
        primary: u32,
        channels: Vec<u32>,
        log: Log,
        fail: bool,
    }

    impl FakeCompositor {
        fn new(inputs: &CompositorInputs<'_, u32>, log: Log) -> Self {
            Self {
                primary: *inputs.primary,
                channels: inputs.channels.iter().map(|texture| **texture).collect(),
                log,
                fail: false,
            }
        }
    }

    impl CompositeDraw for FakeCompositor {
        fn draw(&mut self, seconds: f32) -> Result<()> {
            if self.fail {
                anyhow::bail!("compositor exploded");
            }
            self.log.borrow_mut().push(Call::Draw {
                primary: self.primary,
                channels: [self.channels[0], self.channels[1]],
                seconds,
            });
            Ok(())
        }
    }

    fn three_scene_setup() -> (FakeScenes, FakeCompositor, Log) {
        let log: Log = Rc::default();
        let textures = vec![10, 20, 30];
        let inputs = CompositorInputs::from_ordered(&textures).unwrap();
        let compositor = FakeCompositor::new(&inputs, log.clone());
        let scenes = FakeScenes {
            textures,
            log: log.clone(),
        };
        (scenes, compositor, log)
    }

    #[test]
    fn every_slot_is_written_once_before_the_draw() {
        let (mut scenes, mut compositor, log) = three_scene_setup();
        let mut driver = FrameDriver::new(ScriptedTimeSource::boxed(&[0.0, 0.016]));

        let first = driver.tick(&mut scenes, &mut compositor).unwrap();
        let second = driver.tick(&mut scenes, &mut compositor).unwrap();
        assert!(second.seconds > first.seconds);

        let calls = log.borrow();
        assert_eq!(calls.len(), 8);
        for (frame, sample) in [first, second].iter().enumerate() {
            let frame_calls = &calls[frame * 4..frame * 4 + 4];
            let expected = [
                Call::Write {
                    texture: 10,
                    seconds: sample.seconds,
                },
                Call::Write {
                    texture: 20,
                    seconds: sample.seconds,
                },
                Call::Write {
                    texture: 30,
                    seconds: sample.seconds,
                },
                Call::Draw {
                    primary: 10,
                    channels: [20, 30],
                    seconds: sample.seconds,
                },
            ];
            assert_eq!(frame_calls, expected);
        }
    }

    #[test]
    fn time_never_runs_backwards() {
        let (mut scenes, mut compositor, _log) = three_scene_setup();
        let mut driver = FrameDriver::new(ScriptedTimeSource::boxed(&[0.5, 0.25, 1.0]));
        let seconds: Vec<f32> = (0..3)
            .map(|_| driver.tick(&mut scenes, &mut compositor).unwrap().seconds)
            .collect();
        assert_eq!(seconds, vec![0.5, 0.5, 1.0]);
    }

    #[test]
    fn compositor_errors_propagate() {
        let (mut scenes, mut compositor, log) = three_scene_setup();
        compositor.fail = true;
        let mut driver = FrameDriver::new(ScriptedTimeSource::boxed(&[1.0]));
        let err = driver.tick(&mut scenes, &mut compositor).unwrap_err();
        assert_eq!(err.to_string(), "compositor exploded");
        // Scenes still rendered before the failing draw.
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn system_time_starts_at_zero_and_counts_frames() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        assert!(first.seconds < 0.5);
        assert!(second.seconds >= first.seconds);
    }

    #[test]
    fn fixed_policies_pin_time() {
        let mut source = time_source_for_policy(&RenderPolicy::Still { time: 4.5 });
        assert_eq!(source.sample().seconds, 4.5);
        assert_eq!(source.sample().seconds, 4.5);

        let mut export = time_source_for_policy(&RenderPolicy::Export {
            time: 1.25,
            path: PathBuf::from("frame.png"),
        });
        assert_eq!(export.sample().seconds, 1.25);
        assert_eq!(export.sample().frame_index, 1);
    }
}
