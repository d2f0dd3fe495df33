//! 外部轉碼程序（ffmpeg）的執行與監控
//!
//! 兩種模式：
//! - `MustComplete`：同步等待結束，不受中斷信號影響（例如音訊合併）
//! - `Supervised`：以固定間隔輪詢程序狀態，每次輪詢都檢查中斷信號，
//!   收到中斷時終止子程序

use super::run_context::RunContext;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 失敗時保留的 stderr 行數
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    MustComplete,
    Supervised,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// 輪詢逾時，程序仍在執行
    Running,
    Succeeded,
    Failed(Option<i32>),
    Cancelled,
}

impl ProcessState {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }

    fn from_exit_status(status: ExitStatus) -> Self {
        if status.success() {
            Self::Succeeded
        } else {
            Self::Failed(status.code())
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    program: String,
    base_args: Vec<String>,
    hwaccel: bool,
    shutdown_signal: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl ProcessSupervisor {
    #[must_use]
    pub fn new(program: impl Into<String>, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            hwaccel: false,
            shutdown_signal,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// 依執行設定建立 ffmpeg 監控器
    #[must_use]
    pub fn ffmpeg(context: &RunContext) -> Self {
        Self::new(
            context.settings.ffmpeg_path.clone(),
            Arc::clone(&context.shutdown_signal),
        )
        .with_base_args(["-hide_banner", "-loglevel", "error"])
        .with_hwaccel(context.settings.hwaccel_cuda)
        .with_poll_interval(context.poll_interval())
    }

    #[must_use]
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_hwaccel(mut self, hwaccel: bool) -> Self {
        self.hwaccel = hwaccel;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// 完整參數列：固定參數、硬體加速、呼叫端參數
    #[must_use]
    pub fn command_line(&self, args: &[String]) -> Vec<String> {
        let mut command_line = self.base_args.clone();
        if self.hwaccel {
            command_line.extend(["-hwaccel".to_string(), "cuda".to_string()]);
        }
        command_line.extend_from_slice(args);
        command_line
    }

    fn build_command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.command_line(args));
        command.stdin(Stdio::null());
        command
    }

    pub fn run(&self, args: &[String], mode: RunMode) -> bool {
        self.run_state(args, mode).is_success()
    }

    pub fn run_state(&self, args: &[String], mode: RunMode) -> ProcessState {
        debug!("執行: {} {}", self.program, self.command_line(args).join(" "));
        match mode {
            RunMode::MustComplete => self.run_to_completion(args),
            RunMode::Supervised => self.run_supervised(args),
        }
    }

    fn run_to_completion(&self, args: &[String]) -> ProcessState {
        let status = self
            .build_command(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => {
                let state = ProcessState::from_exit_status(status);
                if !state.is_success() {
                    error!("{} 執行失敗: {status}", self.program);
                }
                state
            }
            Err(e) => {
                error!("無法啟動 {}: {e}", self.program);
                ProcessState::Failed(None)
            }
        }
    }

    fn run_supervised(&self, args: &[String]) -> ProcessState {
        let mut command = self.build_command(args);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("無法啟動 {}: {e}", self.program);
                return ProcessState::Failed(None);
            }
        };
        let pid = child.id();
        debug!("已啟動程序 [{pid}]: {}", self.program);

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        spawn_log_reader(child.stdout.take(), None);
        let stderr_reader = spawn_log_reader(child.stderr.take(), Some(Arc::clone(&stderr_tail)));

        let state = loop {
            let state = match child.try_wait() {
                Ok(Some(status)) => ProcessState::from_exit_status(status),
                Ok(None) => ProcessState::Running,
                Err(e) => {
                    warn!("無法檢查程序狀態 [{pid}]: {e}");
                    let _ = child.kill();
                    let _ = child.wait();
                    ProcessState::Failed(None)
                }
            };
            if state != ProcessState::Running {
                break state;
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                warn!("收到中斷信號，終止程序 [{pid}]");
                let _ = child.kill();
                let _ = child.wait();
                info!("已終止程序 [{pid}]");
                return ProcessState::Cancelled;
            }

            thread::sleep(self.poll_interval);
        };

        if let ProcessState::Failed(code) = state {
            if let Some(reader) = stderr_reader {
                let _ = reader.join();
            }
            let message = stderr_tail
                .lock()
                .map(|lines| lines.iter().cloned().collect::<Vec<_>>().join("\n"))
                .unwrap_or_default();
            error!(
                "{} 執行失敗 [{pid}] (exit code: {}): {message}",
                self.program,
                code.map_or_else(|| "signal".to_string(), |c| c.to_string())
            );
        }

        state
    }

    /// 執行並收集標準輸出的原始位元組，失敗時回傳 None
    pub fn capture_stdout(&self, args: &[String]) -> Result<Option<Vec<u8>>> {
        let output = self
            .build_command(args)
            .stderr(Stdio::null())
            .output()
            .with_context(|| format!("無法執行 {}", self.program))?;

        if output.status.success() {
            Ok(Some(output.stdout))
        } else {
            warn!("{} 執行失敗: {}", self.program, output.status);
            Ok(None)
        }
    }
}

/// 逐行讀取子程序輸出並寫入 debug log，可選擇保留最後幾行
fn spawn_log_reader<R: Read + Send + 'static>(
    stream: Option<R>,
    tail: Option<Arc<Mutex<VecDeque<String>>>>,
) -> Option<JoinHandle<()>> {
    let stream = stream?;
    Some(thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(std::result::Result::ok) {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            debug!("{line}");
            if let Some(tail) = &tail
                && let Ok(mut lines) = tail.lock()
            {
                if lines.len() == STDERR_TAIL_LINES {
                    lines.pop_front();
                }
                lines.push_back(line);
            }
        }
    }))
}
