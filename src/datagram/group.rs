//! Product group information datagrams.

use super::{
    ChangeType, DatagramType, GroupType, InformationRequestState, NameResolver, NodeVariation,
    NodeVelocity, ToTelegram,
};
use crate::error::Result;
use crate::telegram::{Mode, Parameter, Telegram};
use crate::types::Scope;

const NAME_LENGTH: usize = 64;
const BITMAP_LENGTH: usize = 25;

/// Fields shared by the group information notifications.
///
/// `OFFSET` shifts the layout for notifications that carry a prefix.
pub trait GroupInformation: DatagramType {
    const OFFSET: usize = 0;

    fn group_id(&self) -> Result<u8> {
        Ok(self.payload().read_u8(Self::OFFSET)?)
    }

    fn order(&self) -> Result<u16> {
        Ok(self.payload().read_u16(Self::OFFSET + 1)?)
    }

    fn placement(&self) -> Result<u8> {
        Ok(self.payload().read_u8(Self::OFFSET + 3)?)
    }

    fn name(&self) -> Result<String> {
        Ok(self.payload().read_string(Self::OFFSET + 4, NAME_LENGTH)?)
    }

    fn velocity(&self) -> Result<NodeVelocity> {
        Ok(self
            .payload()
            .read_enum(Self::OFFSET + 68, NodeVelocity::Undefined)?)
    }

    fn node_variation(&self) -> Result<NodeVariation> {
        Ok(self
            .payload()
            .read_enum(Self::OFFSET + 69, NodeVariation::NotSet)?)
    }

    fn group_type(&self) -> Result<GroupType> {
        Ok(self.payload().read_enum(Self::OFFSET + 70, GroupType::User)?)
    }

    fn node_count(&self) -> Result<u8> {
        Ok(self.payload().read_u8(Self::OFFSET + 71)?)
    }

    /// Identifiers of the member nodes, from the 200-bit membership map.
    fn nodes(&self) -> Result<Vec<u8>> {
        let bits = self.payload().read_bits(Self::OFFSET + 72, BITMAP_LENGTH)?;
        Ok(bits
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(|(index, _)| index as u8)
            .collect())
    }

    fn revision(&self) -> Result<u16> {
        Ok(self.payload().read_u16(Self::OFFSET + 97)?)
    }
}

fn group_information_telegram<T: GroupInformation>(info: &T) -> Result<Telegram> {
    let nodes = info
        .nodes()?
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("-");
    let mut telegram = Telegram::new(Mode::Response, Scope::Group)
        .with_identifier(info.group_id()?)
        .with_name(info.name()?);
    telegram.set_parameter(Parameter::Type, info.group_type()?);
    telegram.set_parameter(Parameter::Nodes, nodes);
    Ok(telegram)
}

datagram!(GetGroupInformationReq = GetGroupInformationReq, 1);

impl GetGroupInformationReq {
    pub fn new(group_id: u8) -> Result<Self> {
        Ok(Self::from_bytes(&[group_id])?)
    }
}

datagram!(GetGroupInformationCfm = GetGroupInformationCfm, 2);

impl GetGroupInformationCfm {
    pub fn state(&self) -> Result<InformationRequestState> {
        Ok(self
            .payload
            .read_enum(0, InformationRequestState::RequestRejected)?)
    }

    pub fn group_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(1)?)
    }
}

datagram!(GetGroupInformationNtf = GetGroupInformationNtf, 99);

impl GroupInformation for GetGroupInformationNtf {}

impl ToTelegram for GetGroupInformationNtf {
    fn to_telegram(&self, _resolve: NameResolver<'_>) -> Result<Telegram> {
        group_information_telegram(self)
    }
}

datagram!(GetAllGroupsInformationReq = GetAllGroupsInformationReq, 2);

impl GetAllGroupsInformationReq {
    /// Restrict the reply to groups of one type.
    pub fn filtered(group_type: GroupType) -> Result<Self> {
        let mut req = Self::empty();
        req.payload.write_u8(0, 1)?;
        req.payload.write_enum(1, group_type)?;
        Ok(req)
    }

    pub fn filter(&self) -> Result<Option<GroupType>> {
        if self.payload.read_u8(0)? == 0 {
            return Ok(None);
        }
        Ok(Some(self.payload.read_enum(1, GroupType::User)?))
    }
}

datagram!(GetAllGroupsInformationCfm = GetAllGroupsInformationCfm, 2);

impl GetAllGroupsInformationCfm {
    pub fn status(&self) -> Result<u8> {
        Ok(self.payload.read_u8(0)?)
    }

    pub fn total_groups(&self) -> Result<u8> {
        Ok(self.payload.read_u8(1)?)
    }
}

datagram!(GetAllGroupsInformationNtf = GetAllGroupsInformationNtf, 99);

impl GroupInformation for GetAllGroupsInformationNtf {}

impl ToTelegram for GetAllGroupsInformationNtf {
    fn to_telegram(&self, _resolve: NameResolver<'_>) -> Result<Telegram> {
        group_information_telegram(self)
    }
}

datagram!(GetAllGroupsInformationFinishedNtf = GetAllGroupsInformationFinishedNtf, 0);

datagram!(
    /// A group was deleted or modified; the change type precedes the group layout.
    GroupInformationChangedNtf = GroupInformationChangedNtf, 100
);

impl GroupInformationChangedNtf {
    pub fn change_type(&self) -> Result<ChangeType> {
        Ok(self.payload.read_enum(0, ChangeType::Modified)?)
    }
}

impl GroupInformation for GroupInformationChangedNtf {
    const OFFSET: usize = 1;
}

impl ToTelegram for GroupInformationChangedNtf {
    fn to_telegram(&self, _resolve: NameResolver<'_>) -> Result<Telegram> {
        group_information_telegram(self)
    }
}
