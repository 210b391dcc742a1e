//! Gateway-level datagrams: errors, reboot, state, clock, password, monitoring.

use std::time::SystemTime;

use super::{DatagramType, GatewayError, GatewayState};
use crate::error::{DatagramError, Result};
use crate::PASSWORD_LENGTH;

datagram!(
    /// Error reported by the appliance for a malformed or rejected request.
    ErrorNtf = ErrorNtf, 1
);

impl ErrorNtf {
    pub fn error(&self) -> Result<GatewayError> {
        Ok(self.payload.read_enum(0, GatewayError::Undefined)?)
    }
}

datagram!(RebootReq = RebootReq, 0);
datagram!(RebootCfm = RebootCfm, 0);

datagram!(
    /// Cheap state query, also used as keep-alive.
    GetStateReq = GetStateReq, 0
);

datagram!(GetStateCfm = GetStateCfm, 6);

impl GetStateCfm {
    pub fn gateway_state(&self) -> Result<GatewayState> {
        Ok(self.payload.read_enum(0, GatewayState::TestMode)?)
    }

    pub fn sub_state(&self) -> Result<u8> {
        Ok(self.payload.read_u8(1)?)
    }
}

datagram!(SetUtcReq = SetUtcReq, 4);

impl SetUtcReq {
    pub fn new(time: SystemTime) -> Result<Self> {
        let mut req = Self::empty();
        req.set_timestamp(time)?;
        Ok(req)
    }

    pub fn timestamp(&self) -> Result<SystemTime> {
        Ok(self.payload.read_timestamp(0)?)
    }

    pub fn set_timestamp(&mut self, time: SystemTime) -> Result<()> {
        Ok(self.payload.write_timestamp(0, time)?)
    }
}

datagram!(SetUtcCfm = SetUtcCfm, 0);

datagram!(
    /// Authentication request, the password zero-padded to 32 bytes.
    PasswordEnterReq = PasswordEnterReq, PASSWORD_LENGTH
);

impl PasswordEnterReq {
    pub fn new(password: &str) -> Result<Self> {
        if password.len() > PASSWORD_LENGTH {
            return Err(DatagramError::ValueTooLong {
                len: password.len(),
                max: PASSWORD_LENGTH,
            }
            .into());
        }
        let mut req = Self::empty();
        req.payload.write_string(0, password, PASSWORD_LENGTH)?;
        Ok(req)
    }

    pub fn password(&self) -> Result<String> {
        Ok(self.payload.read_string(0, PASSWORD_LENGTH)?)
    }
}

datagram!(PasswordEnterCfm = PasswordEnterCfm, 1);

impl PasswordEnterCfm {
    pub fn status(&self) -> Result<u8> {
        Ok(self.payload.read_u8(0)?)
    }

    /// Whether the appliance accepted the password.
    pub fn is_success(&self) -> bool {
        matches!(self.status(), Ok(0))
    }
}

datagram!(HouseStatusMonitorEnableReq = HouseStatusMonitorEnableReq, 0);
datagram!(HouseStatusMonitorEnableCfm = HouseStatusMonitorEnableCfm, 0);
datagram!(HouseStatusMonitorDisableReq = HouseStatusMonitorDisableReq, 0);
datagram!(HouseStatusMonitorDisableCfm = HouseStatusMonitorDisableCfm, 0);

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_password_is_zero_padded() {
        let req = PasswordEnterReq::new("velux123").unwrap();
        let bytes = req.payload().as_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[..8], b"velux123");
        assert!(bytes[8..].iter().all(|b| *b == 0));
        assert_eq!(req.password().unwrap(), "velux123");

        assert!(PasswordEnterReq::new(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_password_confirmation() {
        assert!(PasswordEnterCfm::from_bytes(&[0]).unwrap().is_success());
        assert!(!PasswordEnterCfm::from_bytes(&[1]).unwrap().is_success());
    }

    #[test]
    fn test_error_code_at_offset_zero() {
        let ntf = ErrorNtf::from_bytes(&[12]).unwrap();
        assert_eq!(ntf.error().unwrap(), GatewayError::Authentication);
        let ntf = ErrorNtf::from_bytes(&[99]).unwrap();
        assert_eq!(ntf.error().unwrap(), GatewayError::Undefined);
    }

    #[test]
    fn test_set_utc() {
        let time = UNIX_EPOCH + Duration::from_secs(0x5F5E_1000);
        let req = SetUtcReq::new(time).unwrap();
        assert_eq!(req.payload().as_bytes(), &[0x5F, 0x5E, 0x10, 0x00]);
        assert_eq!(req.timestamp().unwrap(), time);
    }
}
