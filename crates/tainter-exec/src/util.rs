use std::process::ExitStatus;

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Child,
};

/// SIGTERM, then SIGKILL, to the child's whole process group without waiting in between.
///
/// The child must lead its own group (see `ProcessRunner`), so background jobs of a shell
/// script go down with it.
#[cfg(unix)]
pub async fn kill_graceful(child: &mut Child) -> std::io::Result<()> {
    if let Some(id) = child.id() {
        let pgid = -(id as libc::pid_t);
        // The group is led by our own, not yet reaped, child.
        unsafe {
            libc::kill(pgid, libc::SIGTERM);
            libc::kill(pgid, libc::SIGKILL);
        }
    }
    child.kill().await
}

#[cfg(not(unix))]
pub async fn kill_graceful(child: &mut Child) -> std::io::Result<()> {
    child.kill().await
}

/// Drains a piped stream; a missing pipe reads as empty.
pub async fn read_pipe<R>(pipe: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code: {code}"),
        None => "terminated by signal".to_string(),
    }
}
