//! 等待模型时的心跳指示器
//!
//! 后台 tokio 任务按 80ms 刷新一帧，只持有输出流，不接触会话状态；
//! stop() 发出取消并在 1s 内等待任务结束后清行，Drop 时同样发出取消，保证任何退出路径都会停止。

use std::io::{IsTerminal, Write};
use std::time::{Duration, Instant};

use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_PERIOD: Duration = Duration::from_millis(80);
const JOIN_TIMEOUT: Duration = Duration::from_secs(1);
const SPINNER_COLOR: Color = Color::Rgb {
    r: 255,
    g: 229,
    b: 92,
};

pub struct Spinner {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// 在给定输出流上启动
    pub fn start<W>(label: impl Into<String>, mut out: W) -> Self
    where
        W: Write + Send + 'static,
    {
        let label = label.into();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(FRAME_PERIOD);
            let mut index = 0usize;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let frame = FRAMES[index % FRAMES.len()];
                        let line = format!(
                            "{} {} ({:.1}s)",
                            frame,
                            label,
                            started.elapsed().as_secs_f64()
                        );
                        let _ = write!(out, "\r{}", line.with(SPINNER_COLOR));
                        let _ = out.flush();
                        index += 1;
                    }
                }
            }
            let _ = queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine));
            let _ = out.flush();
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// stdout 为终端时才启动
    pub fn for_stdout(label: &str) -> Option<Self> {
        std::io::stdout()
            .is_terminal()
            .then(|| Self::start(label, std::io::stdout()))
    }

    /// 发出停止信号并在有限时间内等待后台任务结束
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if tokio::time::timeout(JOIN_TIMEOUT, handle).await.is_err() {
                tracing::debug!("spinner did not stop within {:?}", JOIN_TIMEOUT);
            }
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    #[tokio::test]
    async fn test_draws_frames_and_clears_on_stop() {
        let buf = SharedBuf::default();
        let spinner = Spinner::start("Waiting for model", buf.clone());
        tokio::time::sleep(Duration::from_millis(200)).await;
        spinner.stop().await;

        let out = buf.text();
        assert!(out.contains("Waiting for model ("));
        assert!(out.contains(FRAMES[0]));
        assert!(out.ends_with("\x1b[2K"));
    }

    #[tokio::test]
    async fn test_drop_cancels_task() {
        let buf = SharedBuf::default();
        let spinner = Spinner::start("x", buf.clone());
        let token = spinner.cancel.clone();
        drop(spinner);
        assert!(token.is_cancelled());
    }
}
