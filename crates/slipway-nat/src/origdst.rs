use std::net::{Ipv4Addr, SocketAddrV4};

use crate::NatError;

/// Destination a redirected connection was originally addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalDst {
    /// `[1, a, b, c, d, port_hi, port_lo]`: address type tag (1 = IPv4), address, port.
    pub raw: [u8; 7],
    pub addr: SocketAddrV4,
}

impl OriginalDst {
    const AF_INET: u16 = 2;

    /// Decodes a kernel `sockaddr_in` as returned for `SO_ORIGINAL_DST`.
    ///
    /// The family is host order, the port and address network order.
    pub fn from_sockaddr(buf: &[u8; 16]) -> Result<Self, NatError> {
        let family = u16::from_ne_bytes([buf[0], buf[1]]);
        if family != Self::AF_INET {
            return Err(NatError::Unsupported(format!(
                "original destination family {family}; only IPv4 is supported"
            )));
        }

        let port = u16::from_be_bytes([buf[2], buf[3]]);
        let ip = Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]);
        Ok(Self {
            raw: [1, buf[4], buf[5], buf[6], buf[7], buf[2], buf[3]],
            addr: SocketAddrV4::new(ip, port),
        })
    }

    /// `"a.b.c.d:port"`.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        use std::os::fd::AsRawFd;

        /// `SO_ORIGINAL_DST` from `linux/netfilter_ipv4.h`.
        const SO_ORIGINAL_DST: libc::c_int = 80;

        /// Recovers the pre-redirect destination of an accepted TCP connection.
        pub fn get_original_dst<S: AsRawFd>(conn: &S) -> Result<OriginalDst, NatError> {
            let mut buf = [0u8; 16];
            let mut len = buf.len() as libc::socklen_t;

            let rc = unsafe {
                libc::getsockopt(
                    conn.as_raw_fd(),
                    libc::SOL_IP,
                    SO_ORIGINAL_DST,
                    buf.as_mut_ptr().cast::<libc::c_void>(),
                    &mut len,
                )
            };
            if rc != 0 {
                return Err(std::io::Error::last_os_error().into());
            }
            OriginalDst::from_sockaddr(&buf)
        }
    } else if #[cfg(unix)] {
        use std::os::fd::AsRawFd;

        pub fn get_original_dst<S: AsRawFd>(_conn: &S) -> Result<OriginalDst, NatError> {
            Err(NatError::Unsupported(
                "original destination recovery requires netfilter".into(),
            ))
        }
    }
}
