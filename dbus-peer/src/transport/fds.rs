//! `sendmsg`/`recvmsg` with `SCM_RIGHTS` ancillary data, built on top of
//! [`tokio::net::UnixStream`]'s readiness-driven `try_io`.

use std::io;
use std::mem::{self, MaybeUninit};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use tokio::io::Interest;
use tokio::net::UnixStream;

pub(super) async fn send_with_fds(
    stream: &UnixStream,
    buf: &[u8],
    fds: &[RawFd],
) -> io::Result<usize> {
    loop {
        stream.writable().await?;

        match stream.try_io(Interest::WRITABLE, || send_once(stream.as_raw_fd(), buf, fds)) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e),
        }
    }
}

pub(super) async fn recv_with_fds(
    stream: &UnixStream,
    buf: &mut [u8],
    max_fds: usize,
) -> io::Result<(usize, Vec<OwnedFd>)> {
    loop {
        stream.readable().await?;

        match stream.try_io(Interest::READABLE, || recv_once(stream.as_raw_fd(), buf, max_fds)) {
            Ok(result) => return Ok(result),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e),
        }
    }
}

/// One non-blocking `sendmsg(2)` attempt. `fds` is attached as a single
/// `SCM_RIGHTS` control message; `sendmsg` is all-or-nothing for ancillary
/// data, so a short payload write never splits it from its descriptors.
fn send_once(raw_fd: RawFd, buf: &[u8], fds: &[RawFd]) -> io::Result<usize> {
    // SAFETY: `iov_base` points at `buf` for the duration of this call only.
    let mut iov = libc::iovec {
        iov_base: buf.as_ptr() as *mut libc::c_void,
        iov_len: buf.len(),
    };

    let mut cmsg_buf = if fds.is_empty() {
        Vec::new()
    } else {
        vec![0u8; unsafe { libc::CMSG_SPACE(fd_bytes(fds.len())) as usize }]
    };

    // SAFETY: `msghdr` is a C struct of integers and pointers; an all-zero
    // value is a valid (empty) message header.
    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;

    if !fds.is_empty() {
        msg.msg_control = cmsg_buf.as_mut_ptr() as *mut libc::c_void;
        msg.msg_controllen = cmsg_buf.len() as _;

        // SAFETY: `msg_control`/`msg_controllen` were just set to point at
        // `cmsg_buf`, which is large enough for exactly one `SCM_RIGHTS`
        // header plus `fds.len()` descriptors.
        unsafe {
            let cmsg = libc::CMSG_FIRSTHDR(&msg);
            debug_assert!(!cmsg.is_null());
            (*cmsg).cmsg_level = libc::SOL_SOCKET;
            (*cmsg).cmsg_type = libc::SCM_RIGHTS;
            (*cmsg).cmsg_len = libc::CMSG_LEN(fd_bytes(fds.len())) as _;
            std::ptr::copy_nonoverlapping(
                fds.as_ptr(),
                libc::CMSG_DATA(cmsg) as *mut RawFd,
                fds.len(),
            );
        }
    }

    // SAFETY: `raw_fd` is a valid, open socket for the lifetime of this
    // synchronous call (guaranteed by `try_io` holding the stream borrowed),
    // and `msg` describes buffers that outlive the call.
    let n = unsafe { libc::sendmsg(raw_fd, &msg, libc::MSG_NOSIGNAL) };

    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// One non-blocking `recvmsg(2)` attempt, collecting any `SCM_RIGHTS`
/// descriptors up to `max_fds`.
fn recv_once(raw_fd: RawFd, buf: &mut [u8], max_fds: usize) -> io::Result<(usize, Vec<OwnedFd>)> {
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr() as *mut libc::c_void,
        iov_len: buf.len(),
    };

    let cmsg_len = fd_bytes(max_fds.max(1));
    let mut cmsg_buf: Vec<MaybeUninit<u8>> =
        vec![MaybeUninit::uninit(); unsafe { libc::CMSG_SPACE(cmsg_len) as usize }];

    // SAFETY: see `send_once`.
    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = cmsg_buf.as_mut_ptr() as *mut libc::c_void;
    msg.msg_controllen = cmsg_buf.len() as _;

    // SAFETY: `raw_fd` is a valid, open socket; `msg` points at buffers
    // (`buf`, `cmsg_buf`) that outlive the call.
    let n = unsafe { libc::recvmsg(raw_fd, &mut msg, 0) };

    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut received = Vec::new();

    // SAFETY: `msg` was populated by a successful `recvmsg` above, so its
    // control buffer (if any) holds well-formed cmsg headers.
    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(&msg);

        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == libc::SOL_SOCKET && (*cmsg).cmsg_type == libc::SCM_RIGHTS {
                let header_len = libc::CMSG_LEN(0) as usize;
                let payload_len = ((*cmsg).cmsg_len as usize).saturating_sub(header_len);
                let count = payload_len / mem::size_of::<RawFd>();
                let data = libc::CMSG_DATA(cmsg) as *const RawFd;

                for i in 0..count {
                    received.push(OwnedFd::from_raw_fd(data.add(i).read_unaligned()));
                }
            }

            cmsg = libc::CMSG_NXTHDR(&msg as *const _ as *mut _, cmsg);
        }
    }

    received.truncate(max_fds);
    Ok((n as usize, received))
}

fn fd_bytes(count: usize) -> u32 {
    (count * mem::size_of::<RawFd>()) as u32
}
