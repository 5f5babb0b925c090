//! 沙箱：路径约束、命令黑名单、输出截断
//!
//! Sandbox 绑定 root_dir，所有路径经 resolve_path 校验必须在 root 下（禁止 ../ 与绝对路径逃逸）；
//! filter_command 是子串扫描而非 shell 解析，只做保守拦截，不是完整的安全边界。

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::core::AgentError;

/// 禁止的命令子串（磁盘清除、提权、关机重启）
const FORBIDDEN_SUBSTR: &[&str] = &[
    "rm -rf /",
    "rm -fr /",
    "rm -rf ~",
    "mkfs",
    "dd if=",
    "> /dev/sd",
    ":(){ :|:& };:", // fork bomb
    "sudo ",
    "doas ",
    "su -",
    "shutdown",
    "reboot",
    "poweroff",
    "init 0",
    "init 6",
];

#[derive(Debug, Clone)]
pub struct Sandbox {
    root_dir: PathBuf,
    max_result_chars: usize,
}

impl Sandbox {
    /// 根目录不存在时创建，并取其规范路径
    pub fn new(root_dir: impl AsRef<Path>, max_result_chars: usize) -> io::Result<Self> {
        let root = root_dir.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root_dir: root.canonicalize()?,
            max_result_chars,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    pub fn max_result_chars(&self) -> usize {
        self.max_result_chars
    }

    /// 将候选路径拼到根目录下并规范化；结果不在根目录（或等于根目录）之下则返回 PathEscape。
    /// 目标可以尚不存在（写文件场景）：已存在的最长前缀做 canonicalize，其余部分按词法拼接；
    /// 悬空的符号链接按目标路径判断。
    pub fn resolve_path(&self, candidate: &str) -> Result<PathBuf, AgentError> {
        let joined = self.root_dir.join(candidate);
        let normalized = normalize_lexically(&joined);
        let canonical = canonicalize_existing_prefix(&normalized)?;
        if canonical.starts_with(&self.root_dir) {
            Ok(canonical)
        } else {
            Err(AgentError::PathEscape(candidate.to_string())) // 如 ../../etc/passwd
        }
    }

    /// 相对根目录的展示路径
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root_dir).unwrap_or(path)
    }

    /// 命令含黑名单子串时返回 BlockedCommand（不区分大小写）
    pub fn filter_command(&self, command: &str) -> Result<(), AgentError> {
        let lower = command.to_lowercase();
        match FORBIDDEN_SUBSTR.iter().find(|f| lower.contains(*f)) {
            Some(forbidden) => Err(AgentError::BlockedCommand(forbidden.trim().to_string())),
            None => Ok(()),
        }
    }

    /// 以沙箱的全局上限截断
    pub fn clamp_result(&self, text: &str) -> String {
        clamp(text, self.max_result_chars)
    }
}

/// 长度（按字符计）不超过 limit 时原样返回；否则保留前 limit 个字符并追加截断说明
pub fn clamp(text: &str, limit: usize) -> String {
    let total = text.chars().count();
    if total <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit).collect();
    format!("{}\n\n...<truncated {} chars>", kept, total - limit)
}

/// 处理 `.` 与 `..`，不访问文件系统
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// 符号链接的最大跟随次数（与常见内核的 ELOOP 上限一致）
const MAX_SYMLINK_HOPS: usize = 40;

/// 已存在的最长前缀做 canonicalize，其余部分拼回；悬空符号链接会按其目标继续解析
fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf, AgentError> {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();
    let mut hops = 0usize;
    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                let mut full = canonical;
                for part in tail.iter().rev() {
                    full.push(part);
                }
                return Ok(full);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let is_link = std::fs::symlink_metadata(&existing)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                if is_link {
                    hops += 1;
                    if hops > MAX_SYMLINK_HOPS {
                        return Err(AgentError::Io(io::Error::new(
                            io::ErrorKind::Other,
                            format!("too many levels of symbolic links: {}", path.display()),
                        )));
                    }
                    let target = std::fs::read_link(&existing)?;
                    let parent = existing
                        .parent()
                        .map(Path::canonicalize)
                        .transpose()?
                        .unwrap_or_default();
                    existing = parent.join(target);
                    continue;
                }
                let Some(name) = existing.file_name().map(|n| n.to_os_string()) else {
                    return Err(AgentError::Io(e));
                };
                tail.push(name);
                if !existing.pop() {
                    return Err(AgentError::Io(e));
                }
            }
            Err(e) => return Err(AgentError::Io(e)),
        }
    }
}
