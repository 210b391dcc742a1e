//! Scene datagrams: listing, information and activation.

use super::{
    ChangeType, CommandPriority, CommandSource, DatagramType, FromTelegram,
    IdentifierResolver, InformationRequestState, NodeVelocity, ParameterType,
    SceneCommandRequestState,
};
use crate::error::Result;
use crate::telegram::{Parameter, Telegram};
use crate::types::{Scope, UNSET_ID};

const NAME_LENGTH: usize = 64;
const LIST_ENTRY_LENGTH: usize = 1 + NAME_LENGTH;
const MAX_LIST_ENTRIES: usize = 3;
const MAX_SCENE_NODES: usize = 45;

/// Resolve the telegram's scene identifier, falling back to its name.
fn scene_id(telegram: &Telegram, resolve: IdentifierResolver<'_>) -> u8 {
    if telegram.identifier == UNSET_ID && !telegram.name.is_empty() {
        resolve(Scope::Scene, &telegram.name)
    } else {
        telegram.identifier
    }
}

datagram!(
    /// Starts scene discovery.
    GetSceneListReq = GetSceneListReq, 0
);

datagram!(GetSceneListCfm = GetSceneListCfm, 1);

impl GetSceneListCfm {
    pub fn total_scenes(&self) -> Result<u8> {
        Ok(self.payload.read_u8(0)?)
    }
}

datagram!(
    /// Up to three scenes per notification, followed by the remaining count.
    GetSceneListNtf = GetSceneListNtf, 197
);

impl GetSceneListNtf {
    pub fn count(&self) -> Result<u8> {
        Ok(self.payload.read_u8(0)?)
    }

    /// `(scene id, name)` pairs carried by this notification.
    pub fn scenes(&self) -> Result<Vec<(u8, String)>> {
        let count = usize::from(self.count()?).min(MAX_LIST_ENTRIES);
        (0..count)
            .map(|i| {
                let offset = 1 + i * LIST_ENTRY_LENGTH;
                Ok((
                    self.payload.read_u8(offset)?,
                    self.payload.read_string(offset + 1, NAME_LENGTH)?,
                ))
            })
            .collect()
    }

    /// Number of scenes still to be reported in further notifications.
    pub fn remaining(&self) -> Result<u8> {
        let count = usize::from(self.count()?).min(MAX_LIST_ENTRIES);
        Ok(self.payload.read_u8(1 + count * LIST_ENTRY_LENGTH)?)
    }

    /// Append a scene entry; used to build notifications in tests and tools.
    pub fn push_scene(&mut self, scene_id: u8, name: &str) -> Result<()> {
        let count = usize::from(self.count()?);
        let offset = 1 + count * LIST_ENTRY_LENGTH;
        self.payload.write_u8(offset, scene_id)?;
        self.payload.write_string(offset + 1, name, NAME_LENGTH)?;
        self.payload.write_u8(0, count as u8 + 1)?;
        Ok(())
    }

    pub fn set_remaining(&mut self, remaining: u8) -> Result<()> {
        let count = usize::from(self.count()?).min(MAX_LIST_ENTRIES);
        Ok(self
            .payload
            .write_u8(1 + count * LIST_ENTRY_LENGTH, remaining)?)
    }
}

datagram!(GetSceneInformationReq = GetSceneInformationReq, 1);

impl GetSceneInformationReq {
    pub fn new(scene_id: u8) -> Result<Self> {
        Ok(Self::from_bytes(&[scene_id])?)
    }

    pub fn scene_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(0)?)
    }
}

datagram!(GetSceneInformationCfm = GetSceneInformationCfm, 2);

impl GetSceneInformationCfm {
    pub fn state(&self) -> Result<InformationRequestState> {
        Ok(self
            .payload
            .read_enum(0, InformationRequestState::RequestRejected)?)
    }

    pub fn scene_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(1)?)
    }
}

datagram!(GetSceneInformationNtf = GetSceneInformationNtf, 247);

impl GetSceneInformationNtf {
    pub fn scene_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(0)?)
    }

    pub fn name(&self) -> Result<String> {
        Ok(self.payload.read_string(1, NAME_LENGTH)?)
    }

    /// `(node id, parameter, value)` of every node stored in the scene.
    pub fn nodes(&self) -> Result<Vec<(u8, ParameterType, u16)>> {
        let count = usize::from(self.payload.read_u8(65)?).min(MAX_SCENE_NODES);
        (0..count)
            .map(|i| {
                let offset = 66 + i * 4;
                Ok((
                    self.payload.read_u8(offset)?,
                    self.payload.read_enum(offset + 1, ParameterType::NotUsed)?,
                    self.payload.read_u16(offset + 2)?,
                ))
            })
            .collect()
    }

    pub fn remaining(&self) -> Result<u8> {
        Ok(self.payload.read_u8(246)?)
    }
}

datagram!(SceneInformationChangedNtf = SceneInformationChangedNtf, 2);

impl SceneInformationChangedNtf {
    pub fn change_type(&self) -> Result<ChangeType> {
        Ok(self.payload.read_enum(0, ChangeType::Modified)?)
    }

    pub fn scene_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(1)?)
    }
}

datagram!(ActivateSceneReq = ActivateSceneReq, 6);

impl ActivateSceneReq {
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

    pub fn scene_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(4)?)
    }

    pub fn set_scene_id(&mut self, id: u8) -> Result<()> {
        Ok(self.payload.write_u8(4, id)?)
    }

    pub fn velocity(&self) -> Result<NodeVelocity> {
        Ok(self.payload.read_enum(5, NodeVelocity::Undefined)?)
    }

    pub fn set_velocity(&mut self, velocity: NodeVelocity) -> Result<()> {
        Ok(self.payload.write_enum(5, velocity)?)
    }
}

impl FromTelegram for ActivateSceneReq {
    fn from_telegram(telegram: &Telegram, resolve: IdentifierResolver<'_>) -> Result<Self> {
        let mut req = Self::empty();
        req.set_originator(telegram.param_enum(Parameter::Source, CommandSource::User))?;
        req.set_priority(telegram.param_enum(Parameter::Priority, CommandPriority::UserLevel1))?;
        req.set_scene_id(scene_id(telegram, resolve))?;
        req.set_velocity(telegram.param_enum(Parameter::Velocity, NodeVelocity::Default))?;
        Ok(req)
    }
}

datagram!(ActivateSceneCfm = ActivateSceneCfm, 3);

impl ActivateSceneCfm {
    pub fn state(&self) -> Result<SceneCommandRequestState> {
        Ok(self
            .payload
            .read_enum(2, SceneCommandRequestState::RequestRejected)?)
    }
}

datagram!(StopSceneReq = StopSceneReq, 5);

impl StopSceneReq {
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

    pub fn scene_id(&self) -> Result<u8> {
        Ok(self.payload.read_u8(4)?)
    }

    pub fn set_scene_id(&mut self, id: u8) -> Result<()> {
        Ok(self.payload.write_u8(4, id)?)
    }
}

impl FromTelegram for StopSceneReq {
    fn from_telegram(telegram: &Telegram, resolve: IdentifierResolver<'_>) -> Result<Self> {
        let mut req = Self::empty();
        req.set_originator(telegram.param_enum(Parameter::Source, CommandSource::User))?;
        req.set_priority(telegram.param_enum(Parameter::Priority, CommandPriority::UserLevel1))?;
        req.set_scene_id(scene_id(telegram, resolve))?;
        Ok(req)
    }
}

datagram!(StopSceneCfm = StopSceneCfm, 3);

impl StopSceneCfm {
    pub fn state(&self) -> Result<SceneCommandRequestState> {
        Ok(self
            .payload
            .read_enum(2, SceneCommandRequestState::RequestRejected)?)
    }
}

session_request!(ActivateSceneReq, StopSceneReq);
session_response!(ActivateSceneCfm, StopSceneCfm);
