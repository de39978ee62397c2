//! Child processes: detached spawning, reaping and real-time signals

use anyhow::{anyhow, Context, Result};
use nix::{
    sys::{
        signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal},
        wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::{self, Pid},
};
use std::{
    fs,
    os::unix::process::CommandExt,
    process::{Command, Stdio},
};

/// Launch `argv` in its own session. Nothing is awaited; the child is reaped
/// by the `SIGCHLD` handler
pub(crate) fn spawn(argv: &[String]) -> Result<u32> {
    let (program, args) = argv.split_first().ok_or_else(|| anyhow!("empty command"))?;
    let program = shellexpand::tilde(program).to_string();
    let args = args
        .iter()
        .map(|a| shellexpand::tilde(a).to_string())
        .collect::<Vec<_>>();

    let mut command = Command::new(&program);
    command.args(&args).stdin(Stdio::null());

    #[allow(unsafe_code)]
    // SAFETY: `setsid` is async-signal-safe
    unsafe {
        command.pre_exec(|| {
            unistd::setsid().map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
            Ok(())
        });
    }

    let child = command
        .spawn()
        .context(format!("failed to spawn '{}'", argv.join(" ")))?;
    log::debug!("spawned '{}' as {}", argv.join(" "), child.id());

    Ok(child.id())
}

/// Collect every child that has exited
pub(crate) fn reap_children() {
    while let Ok(status) = waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
        if status == WaitStatus::StillAlive {
            break;
        }
    }
}

/// Handler for `SIGCHLD`
extern "C" fn on_child_exit(_: libc::c_int) {
    reap_children();
}

/// Reap children asynchronously from now on, and reap those that already
/// exited
pub(crate) fn install_child_reaper() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_child_exit),
        SaFlags::SA_NOCLDSTOP | SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    #[allow(unsafe_code)]
    // SAFETY: the handler only calls `waitpid`
    unsafe {
        signal::sigaction(Signal::SIGCHLD, &action).context("failed to install SIGCHLD handler")?;
    }

    reap_children();
    Ok(())
}

/// Send `SIGRTMIN + offset` to `pid` with `value` as payload
pub(crate) fn queue_signal(pid: u32, offset: i32, value: i32) -> Result<()> {
    let signal = libc::SIGRTMIN() + offset;
    if signal > libc::SIGRTMAX() {
        return Err(anyhow!("real-time signal offset {} is out of range", offset));
    }

    #[allow(unsafe_code)]
    // SAFETY: `sigval` is plain data, the pointer is never dereferenced
    let res = unsafe {
        libc::sigqueue(pid as libc::pid_t, signal, libc::sigval {
            sival_ptr: sigval_word(value) as *mut libc::c_void,
        })
    };

    if res != 0 {
        return Err(anyhow!(
            "sigqueue({}, SIGRTMIN+{}) failed: {}",
            pid,
            offset,
            std::io::Error::last_os_error()
        ));
    }

    Ok(())
}

/// Pointer-sized word whose leading bytes hold `value`, so a receiver reading
/// `si_value.sival_int` sees it. `libc::sigval` only exposes the pointer member
fn sigval_word(value: i32) -> usize {
    let word = value as u32 as usize;
    if cfg!(target_endian = "big") {
        word << (usize::BITS - u32::BITS)
    } else {
        word
    }
}

/// Basename of the executable a process was started with
pub(crate) fn command_name(pid: u32) -> Option<String> {
    let cmdline = fs::read(format!("/proc/{}/cmdline", pid)).ok()?;
    let argv0 = cmdline.split(|b| *b == 0).next()?;
    let argv0 = String::from_utf8_lossy(argv0);
    argv0.rsplit('/').next().map(ToString::to_string)
}

/// The oldest running process named `name`
pub(crate) fn oldest_named(name: &str) -> Option<u32> {
    let processes = psutil::process::processes().ok()?;
    processes
        .into_iter()
        .filter_map(Result::ok)
        .filter(|p| p.name().map_or(false, |n| n == name))
        .min_by(|a, b| {
            a.create_time()
                .partial_cmp(&b.create_time())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|p| p.pid())
}
