//! Actuator commands: send command, run status, product group activation.

use super::{
    CommandPriority, CommandSource, DatagramType, FromTelegram, GroupCommandRequestState,
    IdentifierResolver, NameResolver, NodeCommandRequestState, NodeVelocity, ParameterType,
    RunState, RunStateError, RunStateOwner, SessionResponse, ToTelegram,
};
use crate::error::{DatagramError, Result};
use crate::telegram::{Mode, Parameter, Telegram};
use crate::types::{Scope, SessionId, UNSET_ID};

/// Maximum number of nodes addressed by one send command.
pub const MAX_COMMAND_NODES: usize = 20;

/// Number of functional parameters besides the main parameter.
pub const FUNCTIONAL_PARAMETERS: u8 = 16;

/// Raw target values with a special meaning.
pub mod target {
    /// Fully open / lowest position.
    pub const MIN: u16 = 0x0000;
    /// Fully closed / highest position.
    pub const MAX: u16 = 0xC800;
    /// Stop the current movement.
    pub const STOP: u16 = 0xD200;
    /// Move to the product's default position.
    pub const DEFAULT: u16 = 0xD300;
    /// Leave the parameter unchanged.
    pub const IGNORE: u16 = 0xD400;
}

/// Target and priority for a movement action token.
fn action_defaults(action: &str) -> (u16, CommandPriority) {
    match action.to_ascii_lowercase().as_str() {
        "min" => (target::MIN, CommandPriority::UserLevel1),
        "max" => (target::MAX, CommandPriority::UserLevel1),
        "stop" => (target::STOP, CommandPriority::UserLevel1),
        "start" => (target::DEFAULT, CommandPriority::UserLevel1),
        _ => (target::IGNORE, CommandPriority::UserLevel2),
    }
}

/// Resolve the telegram's identifier in `scope`, falling back to its name.
fn identifier(telegram: &Telegram, scope: Scope, resolve: IdentifierResolver<'_>) -> u8 {
    if telegram.identifier == UNSET_ID && !telegram.name.is_empty() {
        resolve(scope, &telegram.name)
    } else {
        telegram.identifier
    }
}

fn check_functional(index: u8) -> Result<()> {
    if (1..=FUNCTIONAL_PARAMETERS).contains(&index) {
        Ok(())
    } else {
        Err(DatagramError::OutOfRange(format!("functional parameter {index}")).into())
    }
}

// ============================================================================
// Command send
// ============================================================================

datagram!(
    /// Move one or more nodes.
    CommandSendReq = CommandSendReq, 66
);

impl CommandSendReq {
    pub fn originator(&self) -> Result<CommandSource> {
        Ok(self.payload.read_enum(2, CommandSource::User)?)
    }

    pub fn set_originator(&mut self, source: CommandSource) -> Result<()> {
        Ok(self.payload.write_enum(2, source)?)
    }

    pub fn priority(&self) -> Result<CommandPriority> {
        Ok(self.payload.read_enum(3, CommandPriority::UserLevel2)?)
    }

    pub fn set_priority(&mut self, priority: CommandPriority) -> Result<()> {
        Ok(self.payload.write_enum(3, priority)?)
    }

    pub fn parameter_active(&self) -> Result<ParameterType> {
        Ok(self.payload.read_enum(4, ParameterType::MainParameter)?)
    }

    pub fn set_parameter_active(&mut self, parameter: ParameterType) -> Result<()> {
        Ok(self.payload.write_enum(4, parameter)?)
    }

    /// Functional parameter indicator; bit 15 flags FP1, bit 0 flags FP16.
    pub fn functional_indicator(&self) -> Result<u16> {
        Ok(self.payload.read_u16(5)?)
    }

    pub fn main_parameter(&self) -> Result<u16> {
        Ok(self.payload.read_u16(7)?)
    }

    pub fn set_main_parameter(&mut self, value: u16) -> Result<()> {
        Ok(self.payload.write_u16(7, value)?)
    }

    pub fn functional_parameter(&self, index: u8) -> Result<u16> {
        check_functional(index)?;
        Ok(self.payload.read_u16(9 + usize::from(index - 1) * 2)?)
    }

    /// Set functional parameter `index` (1..=16) and raise its indicator bit.
    pub fn set_functional_parameter(&mut self, index: u8, value: u16) -> Result<()> {
        check_functional(index)?;
        self.payload.write_u16(9 + usize::from(index - 1) * 2, value)?;
        let indicator = self.functional_indicator()? | (0x8000 >> (index - 1));
        Ok(self.payload.write_u16(5, indicator)?)
    }

    pub fn nodes(&self) -> Result<Vec<u8>> {
        let count = usize::from(self.payload.read_u8(41)?).min(MAX_COMMAND_NODES);
        Ok(self.payload.read_bytes(42, count)?.to_vec())
    }

    pub fn set_nodes(&mut self, nodes: &[u8]) -> Result<()> {
        self.payload.write_bytes(42, nodes, MAX_COMMAND_NODES)?;
        Ok(self.payload.write_u8(41, nodes.len() as u8)?)
    }

    pub fn priority_level_lock(&self) -> Result<bool> {
        Ok(self.payload.read_u8(62)? != 0)
    }

    pub fn lock_time(&self) -> Result<u8> {
        Ok(self.payload.read_u8(65)?)
    }
}

impl FromTelegram for CommandSendReq {
    fn from_telegram(telegram: &Telegram, resolve: IdentifierResolver<'_>) -> Result<Self> {
        let (default_target, default_priority) = action_defaults(&telegram.action);

        let mut req = Self::empty();
        req.set_originator(telegram.param_enum(Parameter::Source, CommandSource::User))?;
        req.set_priority(telegram.param_enum(Parameter::Priority, default_priority))?;
        req.set_parameter_active(ParameterType::MainParameter)?;
        req.set_main_parameter(telegram.param_u16(Parameter::Target(0), default_target))?;
        for index in 1..=FUNCTIONAL_PARAMETERS {
            match telegram.parameter(Parameter::Target(index)) {
                Some(_) => req.set_functional_parameter(
                    index,
                    telegram.param_u16(Parameter::Target(index), target::IGNORE),
                )?,
                None => req
                    .payload
                    .write_u16(9 + usize::from(index - 1) * 2, target::IGNORE)?,
            }
        }
        req.set_nodes(&[identifier(telegram, Scope::Node, resolve)])?;
        Ok(req)
    }
}

datagram!(CommandSendCfm = CommandSendCfm, 3);

impl CommandSendCfm {
    pub fn state(&self) -> Result<NodeCommandRequestState> {
        Ok(self
            .payload
            .read_enum(2, NodeCommandRequestState::RequestRejected)?)
    }
}

datagram!(
    /// Progress or result of a command for one node and parameter.
    CommandRunStatusNtf = CommandRunStatusNtf, 13
);

impl CommandRunStatusNtf {
    pub fn owner(&self) -> Result<RunStateOwner> {
        Ok(self.payload.read_enum(2, RunStateOwner::Unknown)?)
    }

    pub fn node_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(3)?)
    }

    pub fn parameter(&self) -> Result<ParameterType> {
        Ok(self.payload.read_enum(4, ParameterType::NotUsed)?)
    }

    pub fn value(&self) -> Result<u16> {
        Ok(self.payload.read_u16(5)?)
    }

    pub fn run_state(&self) -> Result<RunState> {
        Ok(self.payload.read_enum(7, RunState::Active)?)
    }

    pub fn run_state_error(&self) -> Result<RunStateError> {
        Ok(self.payload.read_enum(8, RunStateError::UnknownStatusReply)?)
    }

    pub fn run_state_info(&self) -> Result<u32> {
        Ok(self.payload.read_u32(9)?)
    }
}

impl ToTelegram for CommandRunStatusNtf {
    fn to_telegram(&self, resolve: NameResolver<'_>) -> Result<Telegram> {
        let node_id = self.node_id()?;
        let mut telegram = Telegram::new(Mode::Response, Scope::Node)
            .with_identifier(node_id)
            .with_name(resolve(Scope::Node, node_id));
        if let Some(index) = self.parameter()?.index() {
            telegram.set_parameter(Parameter::Current(index), self.value()?);
        }
        if self.run_state()? == RunState::Failed {
            telegram.set_parameter(Parameter::Error, self.run_state_error()?);
            telegram.set_parameter(Parameter::ErrorInfo, self.run_state_info()?);
        }
        Ok(telegram)
    }
}

datagram!(CommandRemainingTimeNtf = CommandRemainingTimeNtf, 6);

impl CommandRemainingTimeNtf {
    pub fn node_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(2)?)
    }

    pub fn parameter(&self) -> Result<ParameterType> {
        Ok(self.payload.read_enum(3, ParameterType::NotUsed)?)
    }

    /// Remaining movement time in seconds.
    pub fn remaining_time(&self) -> Result<u16> {
        Ok(self.payload.read_u16(4)?)
    }
}

impl ToTelegram for CommandRemainingTimeNtf {
    fn to_telegram(&self, resolve: NameResolver<'_>) -> Result<Telegram> {
        let node_id = self.node_id()?;
        let mut telegram = Telegram::new(Mode::Response, Scope::Node)
            .with_identifier(node_id)
            .with_name(resolve(Scope::Node, node_id));
        if let Some(index) = self.parameter()?.index() {
            telegram.set_parameter(Parameter::Countdown(index), self.remaining_time()?);
        }
        Ok(telegram)
    }
}

datagram!(
    /// Last datagram of a command session.
    SessionFinishedNtf = SessionFinishedNtf, 2
);

impl SessionResponse for SessionFinishedNtf {
    fn session_id(&self) -> Result<SessionId> {
        Ok(SessionId(self.payload.read_u16(0)?))
    }

    fn is_final(&self) -> bool {
        true
    }
}

// ============================================================================
// Product group
// ============================================================================

datagram!(
    /// Move all nodes of a product group.
    ActivateProductgroupReq = ActivateProductgroupReq, 13
);

impl ActivateProductgroupReq {
    pub fn originator(&self) -> Result<CommandSource> {
        Ok(self.payload.read_enum(2, CommandSource::User)?)
    }

    pub fn set_originator(&mut self, source: CommandSource) -> Result<()> {
        Ok(self.payload.write_enum(2, source)?)
    }

    pub fn priority(&self) -> Result<CommandPriority> {
        Ok(self.payload.read_enum(3, CommandPriority::UserLevel2)?)
    }

    pub fn set_priority(&mut self, priority: CommandPriority) -> Result<()> {
        Ok(self.payload.write_enum(3, priority)?)
    }

    pub fn group_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(4)?)
    }

    pub fn set_group_id(&mut self, id: u8) -> Result<()> {
        Ok(self.payload.write_u8(4, id)?)
    }

    pub fn parameter_active(&self) -> Result<ParameterType> {
        Ok(self.payload.read_enum(5, ParameterType::MainParameter)?)
    }

    pub fn set_parameter_active(&mut self, parameter: ParameterType) -> Result<()> {
        Ok(self.payload.write_enum(5, parameter)?)
    }

    pub fn value(&self) -> Result<u16> {
        Ok(self.payload.read_u16(6)?)
    }

    pub fn set_value(&mut self, value: u16) -> Result<()> {
        Ok(self.payload.write_u16(6, value)?)
    }

    pub fn velocity(&self) -> Result<NodeVelocity> {
        Ok(self.payload.read_enum(8, NodeVelocity::Undefined)?)
    }

    pub fn set_velocity(&mut self, velocity: NodeVelocity) -> Result<()> {
        Ok(self.payload.write_enum(8, velocity)?)
    }
}

impl FromTelegram for ActivateProductgroupReq {
    fn from_telegram(telegram: &Telegram, resolve: IdentifierResolver<'_>) -> Result<Self> {
        let (default_target, default_priority) = action_defaults(&telegram.action);

        let mut req = Self::empty();
        req.set_originator(telegram.param_enum(Parameter::Source, CommandSource::User))?;
        req.set_priority(telegram.param_enum(Parameter::Priority, default_priority))?;
        req.set_parameter_active(ParameterType::MainParameter)?;
        req.set_group_id(identifier(telegram, Scope::Group, resolve))?;
        req.set_value(telegram.param_u16(Parameter::Target(0), default_target))?;
        req.set_velocity(telegram.param_enum(Parameter::Velocity, NodeVelocity::Default))?;
        Ok(req)
    }
}

datagram!(ActivateProductgroupCfm = ActivateProductgroupCfm, 3);

impl ActivateProductgroupCfm {
    pub fn state(&self) -> Result<GroupCommandRequestState> {
        Ok(self
            .payload
            .read_enum(2, GroupCommandRequestState::UndefinedError)?)
    }
}

session_request!(CommandSendReq, ActivateProductgroupReq);
session_response!(
    CommandSendCfm,
    CommandRunStatusNtf,
    CommandRemainingTimeNtf,
    ActivateProductgroupCfm,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn no_names(_: Scope, _: &str) -> u8 {
        UNSET_ID
    }

    #[test]
    fn test_send_command_max_defaults() {
        let telegram = Telegram::parse("request://node:12#max").unwrap();
        let req = CommandSendReq::from_telegram(&telegram, &no_names).unwrap();

        assert_eq!(req.originator().unwrap(), CommandSource::User);
        assert_eq!(req.priority().unwrap(), CommandPriority::UserLevel1);
        assert_eq!(req.parameter_active().unwrap(), ParameterType::MainParameter);
        assert_eq!(req.main_parameter().unwrap(), target::MAX);
        assert_eq!(req.functional_indicator().unwrap(), 0);
        assert_eq!(req.functional_parameter(1).unwrap(), target::IGNORE);
        assert_eq!(req.functional_parameter(16).unwrap(), target::IGNORE);
        assert_eq!(req.nodes().unwrap(), vec![12]);
    }

    #[test]
    fn test_send_command_explicit_target_and_priority() {
        let telegram =
            Telegram::parse("request://node:0?target=25600&priority=comfortlevel2&target02=100")
                .unwrap();
        let req = CommandSendReq::from_telegram(&telegram, &no_names).unwrap();

        assert_eq!(req.main_parameter().unwrap(), 25600);
        assert_eq!(req.priority().unwrap(), CommandPriority::ComfortLevel2);
        assert_eq!(req.functional_parameter(2).unwrap(), 100);
        assert_eq!(req.functional_indicator().unwrap(), 0x4000);
        assert_eq!(req.nodes().unwrap(), vec![0]);
    }

    #[test]
    fn test_send_command_unresolved_name_uses_unset_id() {
        let telegram = Telegram::parse("request://node/Unknown%20Window#max").unwrap();
        let req = CommandSendReq::from_telegram(&telegram, &no_names).unwrap();
        assert_eq!(req.nodes().unwrap(), vec![UNSET_ID]);
    }

    #[test]
    fn test_run_status_failed_reports_error() {
        let mut ntf = CommandRunStatusNtf::empty();
        let payload = ntf.payload_mut();
        payload.write_u16(0, 5).unwrap();
        payload.write_u8(3, 4).unwrap();
        payload.write_enum(4, ParameterType::FunctionalParameter03).unwrap();
        payload.write_u16(5, 0x1234).unwrap();
        payload.write_enum(7, RunState::Failed).unwrap();
        payload.write_enum(8, RunStateError::Blocked).unwrap();
        payload.write_u32(9, 77).unwrap();

        assert_eq!(ntf.session_id().unwrap(), SessionId(5));
        let telegram = ntf.to_telegram(&|_, _| "Door".to_string()).unwrap();
        assert_eq!(
            telegram.to_string(),
            "response://node/Door?current03=4660&error=Blocked&error-info=77"
        );
    }

    #[test]
    fn test_remaining_time_uses_countdown() {
        let ntf = CommandRemainingTimeNtf::from_bytes(&[0, 1, 9, 0, 0, 30]).unwrap();
        let telegram = ntf.to_telegram(&|_, _| String::new()).unwrap();
        assert_eq!(telegram.to_string(), "response://node:9?countdown=30");
    }

    #[test]
    fn test_session_finished_is_final() {
        let ntf = SessionFinishedNtf::from_bytes(&[0x01, 0x02]).unwrap();
        assert!(ntf.is_final());
        assert_eq!(ntf.session_id().unwrap(), SessionId(0x0102));
        assert!(!CommandSendCfm::empty().is_final());
    }

    #[test]
    fn test_product_group_from_telegram() {
        let telegram = Telegram::parse("request://group/Upstairs#stop").unwrap();
        let req = ActivateProductgroupReq::from_telegram(&telegram, &|scope, name| {
            assert_eq!(scope, Scope::Group);
            assert_eq!(name, "Upstairs");
            2
        })
        .unwrap();

        assert_eq!(req.group_id().unwrap(), 2);
        assert_eq!(req.value().unwrap(), target::STOP);
        assert_eq!(req.velocity().unwrap(), NodeVelocity::Default);
        assert_eq!(req.priority().unwrap(), CommandPriority::UserLevel1);
    }
}
