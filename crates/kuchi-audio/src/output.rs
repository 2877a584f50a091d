//! Output devices
//!
//! The playback graph hands each buffer to an `AudioOutput`. Timing is
//! driven by the graph's own playhead, so a silent output behaves exactly
//! like a device for lip-sync purposes.

use kuchi_core::KuchiResult;

use crate::SampleBuffer;

/// Something that can play a buffer
pub trait AudioOutput: Send + Sync {
    /// Prepare a stream for the buffer. Failure here is a graph error.
    fn open(&self, buffer: &SampleBuffer) -> KuchiResult<Box<dyn OutputStream>>;
}

/// An opened, not necessarily playing, stream
pub trait OutputStream: Send {
    fn play(&mut self) -> KuchiResult<()>;
    /// Stop and release the stream. Safe to call more than once.
    fn stop(&mut self);
}

/// Output that discards audio; used headless and in tests
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentOutput;

impl AudioOutput for SilentOutput {
    fn open(&self, _buffer: &SampleBuffer) -> KuchiResult<Box<dyn OutputStream>> {
        Ok(Box::new(SilentStream))
    }
}

struct SilentStream;

impl OutputStream for SilentStream {
    fn play(&mut self) -> KuchiResult<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}

#[cfg(feature = "device")]
pub use self::device::CpalOutput;

#[cfg(feature = "device")]
mod device {
    use std::sync::mpsc;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    use kuchi_core::{KuchiError, KuchiResult};

    use super::{AudioOutput, OutputStream};
    use crate::SampleBuffer;

    enum Command {
        Play,
        Stop,
    }

    /// Plays through a cpal output device.
    ///
    /// `cpal::Stream` is not `Send` on every host, so each stream lives on
    /// its own thread and is driven by commands.
    #[derive(Clone, Debug, Default)]
    pub struct CpalOutput {
        device_name: Option<String>,
    }

    impl CpalOutput {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_device(name: impl Into<String>) -> Self {
            Self {
                device_name: Some(name.into()),
            }
        }
    }

    impl AudioOutput for CpalOutput {
        fn open(&self, buffer: &SampleBuffer) -> KuchiResult<Box<dyn OutputStream>> {
            let (commands, command_rx) = mpsc::channel::<Command>();
            let (ready_tx, ready_rx) = mpsc::sync_channel::<KuchiResult<()>>(1);
            let buffer = buffer.clone();
            let device_name = self.device_name.clone();

            std::thread::Builder::new()
                .name("kuchi-output".into())
                .spawn(move || {
                    let stream = match build_stream(device_name.as_deref(), buffer) {
                        Ok(stream) => {
                            let _ = ready_tx.send(Ok(()));
                            stream
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    while let Ok(command) = command_rx.recv() {
                        match command {
                            Command::Play => {
                                if let Err(e) = stream.play() {
                                    tracing::warn!(error = %e, "output stream failed to start");
                                }
                            }
                            Command::Stop => break,
                        }
                    }
                })
                .map_err(|e| KuchiError::Graph(format!("output thread: {e}")))?;

            ready_rx
                .recv()
                .map_err(|_| KuchiError::Graph("output thread exited".into()))??;

            Ok(Box::new(CpalStream {
                commands: Some(commands),
            }))
        }
    }

    struct CpalStream {
        commands: Option<mpsc::Sender<Command>>,
    }

    impl OutputStream for CpalStream {
        fn play(&mut self) -> KuchiResult<()> {
            let commands = self
                .commands
                .as_ref()
                .ok_or_else(|| KuchiError::Graph("output stream already stopped".into()))?;
            commands
                .send(Command::Play)
                .map_err(|_| KuchiError::Graph("output thread exited".into()))
        }

        fn stop(&mut self) {
            if let Some(commands) = self.commands.take() {
                let _ = commands.send(Command::Stop);
            }
        }
    }

    impl Drop for CpalStream {
        fn drop(&mut self) {
            self.stop();
        }
    }

    fn build_stream(device_name: Option<&str>, buffer: SampleBuffer) -> KuchiResult<cpal::Stream> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .output_devices()
                .map_err(|e| KuchiError::Graph(e.to_string()))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| KuchiError::Graph(format!("output device {name} not found")))?,
            None => host
                .default_output_device()
                .ok_or_else(|| KuchiError::Graph("no default output device".into()))?,
        };

        let supported = device
            .default_output_config()
            .map_err(|e| KuchiError::Graph(e.to_string()))?;
        let channels = supported.channels() as usize;
        let step = buffer.sample_rate() as f64 / supported.sample_rate().0 as f64;
        let config: cpal::StreamConfig = supported.into();

        let mut cursor = 0.0f64;
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info| {
                    for frame in data.chunks_mut(channels.max(1)) {
                        let value = buffer.samples().get(cursor as usize).copied().unwrap_or(0.0);
                        frame.iter_mut().for_each(|s| *s = value);
                        cursor += step;
                    }
                },
                |e| tracing::warn!(error = %e, "output stream error"),
                None,
            )
            .map_err(|e| KuchiError::Graph(e.to_string()))?;

        // some hosts start streams immediately
        let _ = stream.pause();
        Ok(stream)
    }
}
