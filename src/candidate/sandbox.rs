//! Launch confinement for candidate processes.
//!
//! Every child starts as the leader of its own process group, so a timeout
//! or an early exit can take down everything the candidate forked. On
//! Linux the kernel resource limits from [`ResourceLimits`] are installed
//! between `fork` and `exec`. With [`Isolation::Bubblewrap`] the
//! interpreter additionally runs inside fresh namespaces: no network, a
//! read-only view of the system directories, an empty `/tmp`, and only the
//! private working directory writable.

use crate::types::{Isolation, ResourceLimits, SandboxConfig};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Child, Command};

/// System directories exposed read-only inside bubblewrap (when present).
const READ_ONLY_DIRS: &[&str] = &[
    "/usr",
    "/bin",
    "/sbin",
    "/lib",
    "/lib32",
    "/lib64",
    "/etc/alternatives",
    "/etc/ld.so.cache",
    "/etc/ld.so.conf",
    "/etc/ld.so.conf.d",
];

/// Build the command that runs `argv` (interpreter first) for a candidate
/// whose private directory is `workdir`.
///
/// The environment is cleared except for `PATH`; stdio is left to the
/// caller.
pub fn command(sandbox: &SandboxConfig, workdir: &Path, argv: &[OsString]) -> Command {
    let mut cmd = match sandbox.isolation {
        Isolation::Bubblewrap => {
            let mut cmd = Command::new(&sandbox.bubblewrap);
            cmd.args(bubblewrap_args(workdir)).arg("--").args(argv);
            cmd
        }
        Isolation::Unconfined => {
            let mut cmd = Command::new(argv.first().cloned().unwrap_or_default());
            cmd.args(argv.iter().skip(1));
            cmd
        }
    };

    cmd.current_dir(workdir).env_clear();
    if let Some(path) = std::env::var_os("PATH") {
        cmd.env("PATH", path);
    }
    confine(&mut cmd, &sandbox.limits, sandbox.cpu_seconds());
    cmd
}

fn bubblewrap_args(workdir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["--die-with-parent", "--new-session", "--unshare-all"]
        .iter()
        .map(OsString::from)
        .collect();
    for dir in READ_ONLY_DIRS {
        args.extend([
            OsString::from("--ro-bind-try"),
            OsString::from(dir),
            OsString::from(dir),
        ]);
    }
    args.extend(
        ["--proc", "/proc", "--dev", "/dev", "--tmpfs", "/tmp"]
            .iter()
            .map(OsString::from),
    );
    args.extend([
        OsString::from("--bind"),
        workdir.as_os_str().to_owned(),
        workdir.as_os_str().to_owned(),
        OsString::from("--chdir"),
        workdir.as_os_str().to_owned(),
    ]);
    args
}

#[cfg(target_os = "linux")]
fn confine(cmd: &mut Command, limits: &ResourceLimits, cpu_seconds: u64) {
    use nix::libc::rlim_t;
    use nix::sys::resource::{setrlimit, Resource};
    use std::os::unix::process::CommandExt;

    let caps = [
        (Resource::RLIMIT_CPU, cpu_seconds),
        (Resource::RLIMIT_AS, limits.max_memory_bytes),
        (Resource::RLIMIT_NPROC, limits.max_processes),
        (Resource::RLIMIT_FSIZE, limits.max_file_bytes),
    ];
    cmd.process_group(0);
    // SAFETY: the hook runs in the forked child before exec and only issues
    // setrlimit(2) on values captured by move; it neither allocates nor
    // takes locks.
    unsafe {
        cmd.pre_exec(move || {
            for &(resource, value) in &caps {
                let value = value as rlim_t;
                setrlimit(resource, value, value)?;
            }
            Ok(())
        });
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn confine(cmd: &mut Command, _limits: &ResourceLimits, _cpu_seconds: u64) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn confine(_cmd: &mut Command, _limits: &ResourceLimits, _cpu_seconds: u64) {}

/// SIGKILL the child's whole process group, then the child itself.
pub fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
    let _ = child.kill();
}
