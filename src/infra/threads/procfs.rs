//! Linux `/proc/self/task` thread introspection.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::core::{StackFrame, ThreadHandle, ThreadInfo, ThreadIntrospector, ThreadState};

use super::ThreadRegistry;

const TASK_ROOT: &str = "/proc/self/task";

/// Introspector over every OS thread of the current process.
///
/// Names and states come from `stat`; frames come from the kernel stack
/// (`stack`, usually root-only) or, failing that, the single `wchan` symbol.
/// Threads that registered with the attached [`ThreadRegistry`] report their
/// registered name, state, and logical frames instead.
pub struct ProcfsIntrospector {
    root: PathBuf,
    registry: Option<Arc<ThreadRegistry>>,
}

impl Default for ProcfsIntrospector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsIntrospector {
    /// Introspector overlaid with the global registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Arc::clone(ThreadRegistry::global()))
    }

    /// Introspector overlaid with `registry`.
    #[must_use]
    pub fn with_registry(registry: Arc<ThreadRegistry>) -> Self {
        Self {
            root: PathBuf::from(TASK_ROOT),
            registry: Some(registry),
        }
    }

    /// Introspector reporting raw procfs data only.
    #[must_use]
    pub fn without_registry() -> Self {
        Self {
            root: PathBuf::from(TASK_ROOT),
            registry: None,
        }
    }

    /// Whether procfs task enumeration is available.
    #[must_use]
    pub fn is_available() -> bool {
        Path::new(TASK_ROOT).is_dir()
    }
}

impl ThreadIntrospector for ProcfsIntrospector {
    fn list_live_threads(&self) -> Vec<ThreadHandle> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(error = %e, root = %self.root.display(), "cannot enumerate threads");
                return Vec::new();
            }
        };

        let mut tids: Vec<u64> = entries
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
            .collect();
        tids.sort_unstable();
        tids.into_iter().map(ThreadHandle).collect()
    }

    fn inspect(&self, handle: ThreadHandle, max_depth: usize) -> Option<ThreadInfo> {
        let dir = self.root.join(handle.0.to_string());
        // A missing stat file means the thread exited after enumeration.
        let stat = fs::read_to_string(dir.join("stat")).ok()?;
        let (comm, code) = parse_stat(&stat)?;

        if let Some(mut info) = self
            .registry
            .as_ref()
            .and_then(|registry| registry.inspect_os_tid(handle.0, max_depth))
        {
            if info.frames.is_empty() {
                info.frames = kernel_frames(&dir, max_depth);
            }
            return Some(info);
        }

        Some(ThreadInfo {
            name: comm,
            state: ThreadState::from_proc_code(code).unwrap_or(ThreadState::Runnable),
            frames: kernel_frames(&dir, max_depth),
        })
    }
}

/// Split `"<tid> (<comm>) <state> ..."`. The name may itself contain parens.
fn parse_stat(stat: &str) -> Option<(String, char)> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;
    let comm = stat.get(open + 1..close)?.to_string();
    let code = stat.get(close + 1..)?.trim_start().chars().next()?;
    Some((comm, code))
}

fn kernel_frames(dir: &Path, max_depth: usize) -> Vec<StackFrame> {
    if let Ok(stack) = fs::read_to_string(dir.join("stack")) {
        let frames: Vec<_> = stack
            .lines()
            .filter_map(parse_kernel_stack_line)
            .take(max_depth)
            .collect();
        if !frames.is_empty() {
            return frames;
        }
    }

    match fs::read_to_string(dir.join("wchan")) {
        Ok(wchan) => {
            let wchan = wchan.trim();
            if wchan.is_empty() || wchan == "0" || max_depth == 0 {
                Vec::new()
            } else {
                vec![StackFrame::new(wchan, "kernel")]
            }
        }
        Err(_) => Vec::new(),
    }
}

/// `"[<0>] do_sys_poll+0x3f4/0x5c0"` -> `do_sys_poll+0x3f4/0x5c0 @ kernel`.
fn parse_kernel_stack_line(line: &str) -> Option<StackFrame> {
    let symbol = match line.find("] ") {
        Some(idx) => &line[idx + 2..],
        None => line,
    }
    .trim();
    if symbol.is_empty() {
        return None;
    }
    Some(StackFrame::new(symbol, "kernel"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_with_parens_in_name() {
        let (comm, code) = parse_stat("4242 (worker (1)) S 1 4242 4242 0 -1").unwrap();
        assert_eq!(comm, "worker (1)");
        assert_eq!(code, 'S');
    }

    #[test]
    fn test_parse_stat_rejects_garbage() {
        assert!(parse_stat("garbage").is_none());
    }

    #[test]
    fn test_parse_kernel_stack_line() {
        let frame = parse_kernel_stack_line("[<0>] futex_wait_queue+0x60/0x90").unwrap();
        assert_eq!(frame.to_string(), "futex_wait_queue+0x60/0x90 @ kernel");
        assert!(parse_kernel_stack_line("[<0>] ").is_none());
    }

    #[test]
    fn test_lists_current_process_threads() {
        if !ProcfsIntrospector::is_available() {
            return;
        }
        let introspector = ProcfsIntrospector::without_registry();
        let handles = introspector.list_live_threads();
        assert!(!handles.is_empty());
        let inspected = handles
            .iter()
            .filter_map(|h| introspector.inspect(*h, 8))
            .count();
        assert!(inspected >= 1);
    }

    #[test]
    fn test_registered_thread_overlays_procfs() {
        if !ProcfsIntrospector::is_available() || !Path::new("/proc/thread-self").exists() {
            return;
        }
        let registry = Arc::new(ThreadRegistry::new());
        let introspector = ProcfsIntrospector::with_registry(Arc::clone(&registry));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(0);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);

        let overlay_registry = Arc::clone(&registry);
        let overlay = std::thread::spawn(move || {
            let _registration = overlay_registry.register_current_as("procfs-overlay-with-long-name");
            let _frame = crate::frame!("overlay_body");
            ready_tx.send(()).unwrap();
            let _ = done_rx.recv();
        });
        ready_rx.recv().unwrap();

        let infos: Vec<_> = introspector
            .list_live_threads()
            .into_iter()
            .filter_map(|h| introspector.inspect(h, 8))
            .collect();
        let overlay_info = infos
            .iter()
            .find(|info| info.name == "procfs-overlay-with-long-name")
            .expect("registered thread reported under its full name");
        assert_eq!(overlay_info.frames[0].function, "overlay_body");

        drop(done_tx);
        overlay.join().unwrap();
    }
}
