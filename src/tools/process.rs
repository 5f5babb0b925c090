//! 子进程组：bash 与测试生成后端的子进程各自成组，超时后连同派生的孙进程一起结束

use tokio::process::Command;

/// 让子进程成为新进程组的组长（Unix）；其它平台不做处理
pub fn isolate_process_group(command: &mut Command) {
    #[cfg(unix)]
    {
        command.process_group(0);
    }
    #[cfg(not(unix))]
    {
        let _ = command;
    }
}

/// 向以 pid 为组长的整个进程组发送 SIGKILL；进程组已不存在时忽略
pub fn kill_process_group(pid: Option<u32>) {
    #[cfg(unix)]
    {
        let Some(pid) = pid.filter(|p| *p != 0) else {
            return;
        };
        // SAFETY: kill 只发送信号，不读写任何内存
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            tracing::debug!(pid, error = %std::io::Error::last_os_error(), "kill process group");
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::time::Duration;

    #[tokio::test]
    async fn test_kill_group_reaches_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("leaked.txt");
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("(sleep 1; echo leaked > '{}') & wait", marker.display()))
            .stdout(Stdio::null())
            .kill_on_drop(true);
        isolate_process_group(&mut cmd);

        let mut child = cmd.spawn().unwrap();
        kill_process_group(child.id());
        let _ = child.wait().await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[test]
    fn test_kill_missing_pid_is_noop() {
        kill_process_group(None);
        kill_process_group(Some(0));
    }
}
