//! Node (actuator) information datagrams.

use std::time::SystemTime;

use super::{
    DatagramType, InformationRequestState, NameResolver, NodeState, NodeType, NodeVariation,
    NodeVelocity, PowerMode, ToTelegram,
};
use crate::error::{DatagramError, Result};
use crate::telegram::{Mode, Parameter, Telegram};
use crate::types::Scope;

const NAME_LENGTH: usize = 64;
const MAX_ALIASES: usize = 5;

/// Fields shared by the single-node and all-nodes information notifications.
pub trait NodeInformation: DatagramType {
    fn node_id(&self) -> Result<u8> {
        Ok(self.payload().read_u8(0)?)
    }

    fn order(&self) -> Result<u16> {
        Ok(self.payload().read_u16(1)?)
    }

    fn placement(&self) -> Result<u8> {
        Ok(self.payload().read_u8(3)?)
    }

    fn name(&self) -> Result<String> {
        Ok(self.payload().read_string(4, NAME_LENGTH)?)
    }

    fn velocity(&self) -> Result<NodeVelocity> {
        Ok(self.payload().read_enum(68, NodeVelocity::Undefined)?)
    }

    fn node_type(&self) -> Result<NodeType> {
        Ok(self.payload().read_enum(69, NodeType::None)?)
    }

    fn product_group(&self) -> Result<u8> {
        Ok(self.payload().read_u8(71)?)
    }

    fn product_type(&self) -> Result<u8> {
        Ok(self.payload().read_u8(72)?)
    }

    fn variation(&self) -> Result<NodeVariation> {
        Ok(self.payload().read_enum(73, NodeVariation::NotSet)?)
    }

    fn power_mode(&self) -> Result<PowerMode> {
        Ok(self.payload().read_enum(74, PowerMode::AlwaysAlive)?)
    }

    fn build_number(&self) -> Result<u8> {
        Ok(self.payload().read_u8(75)?)
    }

    fn serial_number(&self) -> Result<u64> {
        Ok(self.payload().read_u64(76)?)
    }

    fn state(&self) -> Result<NodeState> {
        Ok(self.payload().read_enum(84, NodeState::StateUnknown)?)
    }

    fn current_position(&self) -> Result<u16> {
        Ok(self.payload().read_u16(85)?)
    }

    fn target_position(&self) -> Result<u16> {
        Ok(self.payload().read_u16(87)?)
    }

    /// Current value of functional parameter 1 to 4.
    fn functional_position(&self, index: usize) -> Result<u16> {
        if !(1..=4).contains(&index) {
            return Err(DatagramError::OutOfRange(format!("functional parameter {index}")).into());
        }
        Ok(self.payload().read_u16(89 + (index - 1) * 2)?)
    }

    /// Remaining time of the current movement in seconds.
    fn remaining_time(&self) -> Result<u16> {
        Ok(self.payload().read_u16(97)?)
    }

    fn timestamp(&self) -> Result<SystemTime> {
        Ok(self.payload().read_timestamp(99)?)
    }

    /// Alias (type, value) pairs, at most five.
    fn aliases(&self) -> Result<Vec<(u16, u16)>> {
        let count = usize::from(self.payload().read_u8(103)?).min(MAX_ALIASES);
        (0..count)
            .map(|i| {
                let offset = 104 + i * 4;
                Ok((
                    self.payload().read_u16(offset)?,
                    self.payload().read_u16(offset + 2)?,
                ))
            })
            .collect()
    }
}

fn node_information_telegram<T: NodeInformation>(info: &T) -> Result<Telegram> {
    let mut telegram = Telegram::new(Mode::Response, Scope::Node)
        .with_identifier(info.node_id()?)
        .with_name(info.name()?);
    telegram.set_parameter(Parameter::Type, info.node_type()?);
    telegram.set_parameter(Parameter::State, info.state()?);
    telegram.set_parameter(Parameter::Current(0), info.current_position()?);
    telegram.set_parameter(Parameter::Target(0), info.target_position()?);
    telegram.set_parameter(Parameter::Countdown(0), info.remaining_time()?);
    Ok(telegram)
}

datagram!(GetNodeInformationReq = GetNodeInformationReq, 1);

impl GetNodeInformationReq {
    pub fn new(node_id: u8) -> Result<Self> {
        Ok(Self::from_bytes(&[node_id])?)
    }

    pub fn node_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(0)?)
    }
}

datagram!(GetNodeInformationCfm = GetNodeInformationCfm, 2);

impl GetNodeInformationCfm {
    pub fn state(&self) -> Result<InformationRequestState> {
        Ok(self
            .payload
            .read_enum(0, InformationRequestState::RequestRejected)?)
    }

    pub fn node_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(1)?)
    }
}

datagram!(GetNodeInformationNtf = GetNodeInformationNtf, 124);

impl NodeInformation for GetNodeInformationNtf {}

impl ToTelegram for GetNodeInformationNtf {
    fn to_telegram(&self, _resolve: NameResolver<'_>) -> Result<Telegram> {
        node_information_telegram(self)
    }
}

datagram!(
    /// Starts node discovery; answered by one notification per node.
    GetAllNodesInformationReq = GetAllNodesInformationReq, 0
);

datagram!(GetAllNodesInformationCfm = GetAllNodesInformationCfm, 2);

impl GetAllNodesInformationCfm {
    /// Whether the system table is empty.
    pub fn is_empty_table(&self) -> Result<bool> {
        Ok(self.payload.read_u8(0)? == 1)
    }

    pub fn total_nodes(&self) -> Result<u8> {
        Ok(self.payload.read_u8(1)?)
    }
}

datagram!(GetAllNodesInformationNtf = GetAllNodesInformationNtf, 124);

impl NodeInformation for GetAllNodesInformationNtf {}

impl ToTelegram for GetAllNodesInformationNtf {
    fn to_telegram(&self, _resolve: NameResolver<'_>) -> Result<Telegram> {
        node_information_telegram(self)
    }
}

datagram!(GetAllNodesInformationFinishedNtf = GetAllNodesInformationFinishedNtf, 0);

datagram!(
    /// Name, order or placement of a node changed.
    NodeInformationChangedNtf = NodeInformationChangedNtf, 69
);

impl NodeInformationChangedNtf {
    pub fn node_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(0)?)
    }

    pub fn name(&self) -> Result<String> {
        Ok(self.payload.read_string(1, NAME_LENGTH)?)
    }

    pub fn order(&self) -> Result<u16> {
        Ok(self.payload.read_u16(65)?)
    }

    pub fn placement(&self) -> Result<u8> {
        Ok(self.payload.read_u8(67)?)
    }

    pub fn variation(&self) -> Result<NodeVariation> {
        Ok(self.payload.read_enum(68, NodeVariation::NotSet)?)
    }
}

datagram!(
    /// Position update of a moving or moved node.
    NodeStatePositionChangedNtf = NodeStatePositionChangedNtf, 20
);

impl NodeStatePositionChangedNtf {
    pub fn node_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(0)?)
    }

    pub fn state(&self) -> Result<NodeState> {
        Ok(self.payload.read_enum(1, NodeState::StateUnknown)?)
    }

    pub fn current_position(&self) -> Result<u16> {
        Ok(self.payload.read_u16(2)?)
    }

    pub fn target_position(&self) -> Result<u16> {
        Ok(self.payload.read_u16(4)?)
    }

    /// Current value of functional parameter 1 to 4.
    pub fn functional_position(&self, index: usize) -> Result<u16> {
        if !(1..=4).contains(&index) {
            return Err(DatagramError::OutOfRange(format!("functional parameter {index}")).into());
        }
        Ok(self.payload.read_u16(6 + (index - 1) * 2)?)
    }

    pub fn remaining_time(&self) -> Result<u16> {
        Ok(self.payload.read_u16(14)?)
    }

    pub fn timestamp(&self) -> Result<SystemTime> {
        Ok(self.payload.read_timestamp(16)?)
    }
}

impl ToTelegram for NodeStatePositionChangedNtf {
    fn to_telegram(&self, resolve: NameResolver<'_>) -> Result<Telegram> {
        let node_id = self.node_id()?;
        let mut telegram = Telegram::new(Mode::Response, Scope::Node)
            .with_identifier(node_id)
            .with_name(resolve(Scope::Node, node_id));
        telegram.set_parameter(Parameter::State, self.state()?);
        telegram.set_parameter(Parameter::Current(0), self.current_position()?);
        telegram.set_parameter(Parameter::Target(0), self.target_position()?);
        telegram.set_parameter(Parameter::Countdown(0), self.remaining_time()?);
        Ok(telegram)
    }
}
