//! Privilege drop after binding (§4.15, `server/server.cpp`'s `switch_user`).
//!
//! Described only at the interface: deep coverage of `setuid`/`setgid`
//! sequencing is out of scope the same way the original treats it as
//! start-up glue rather than a tested subsystem.

#[cfg(unix)]
/// Drops privileges to `username` if the process is currently root.
///
/// A no-op if the process is not running as root (the original silently
/// skips the switch in that case too).
///
/// # Errors
///
/// Returns the underlying [`std::io::Error`] if the user is unknown or the
/// `setgid`/`setuid` calls fail.
pub fn drop_privileges(username: &str) -> std::io::Result<()> {
    // SAFETY-free at this call site: the unsafe libc calls live in the
    // private helper below so this crate's public surface stays safe.
    if !is_root() {
        return Ok(());
    }
    let (uid, gid) = lookup_user(username)?;
    apply_ids(uid, gid)
}

#[cfg(not(unix))]
/// Privilege drop is a Unix-only concept; non-Unix targets accept and
/// ignore the request.
pub fn drop_privileges(_username: &str) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: getuid takes no arguments and cannot fail.
    unsafe { libc::getuid() == 0 }
}

#[cfg(unix)]
fn lookup_user(username: &str) -> std::io::Result<(libc::uid_t, libc::gid_t)> {
    use std::ffi::CString;

    let c_username = CString::new(username).map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "username contains a NUL byte"))?;
    // SAFETY: c_username stays alive for the duration of the call; getpwnam
    // returns a pointer into thread-local storage that we only read from
    // immediately, never store.
    let passwd = unsafe { libc::getpwnam(c_username.as_ptr()) };
    if passwd.is_null() {
        return Err(std::io::Error::new(std::io::ErrorKind::NotFound, format!("unknown user {username}")));
    }
    // SAFETY: passwd was just checked non-null and points to a valid struct
    // passwd for the lifetime of this expression.
    let (uid, gid) = unsafe { ((*passwd).pw_uid, (*passwd).pw_gid) };
    Ok((uid, gid))
}

#[cfg(unix)]
fn apply_ids(uid: libc::uid_t, gid: libc::gid_t) -> std::io::Result<()> {
    // SAFETY: setgid before setuid, as dropping the uid first would forfeit
    // the permission needed to change the gid.
    let result = unsafe { libc::setgid(gid) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: uid is the value just looked up for this username.
    let result = unsafe { libc::setuid(uid) };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(all(test, not(unix)))]
mod tests {
    #[test]
    fn non_unix_drop_is_a_no_op() {
        assert!(super::drop_privileges("nobody").is_ok());
    }
}
