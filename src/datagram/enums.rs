//! Enumerations carried in datagram payloads.

wire_enum! {
    /// Error code of the error notification.
    pub enum GatewayError: u8 {
        Undefined = 0,
        UnknownCommand = 1,
        FrameStructure = 2,
        DeviceBusy = 7,
        TableContent = 8,
        Authentication = 12,
    }
}

wire_enum! {
    pub enum GatewayState: u8 {
        TestMode = 0,
        GatewayModeEmptyTable = 1,
        GatewayModeFilledTable = 2,
        BeaconModeNotConfigured = 3,
        BeaconModeConfigured = 4,
    }
}

wire_enum! {
    /// Who issued a command.
    pub enum CommandSource: u8 {
        User = 1,
        Rain = 2,
        Timer = 3,
        Ups = 5,
        Saac = 8,
        Wind = 9,
        LoadShedding = 11,
        LocalLight = 12,
        UnspecificEnvironmentSensor = 13,
        Emergency = 255,
    }
}

wire_enum! {
    pub enum CommandPriority: u8 {
        HumanProtection = 0,
        EnvironmentProtection = 1,
        UserLevel1 = 2,
        UserLevel2 = 3,
        ComfortLevel1 = 4,
        ComfortLevel2 = 5,
        ComfortLevel3 = 6,
        ComfortLevel4 = 7,
    }
}

wire_enum! {
    pub enum NodeVelocity: u8 {
        Default = 0,
        Silent = 1,
        Fast = 2,
        Undefined = 255,
    }
}

wire_enum! {
    /// Actuator type and sub type, as reported in node information.
    pub enum NodeType: u16 {
        None = 0x0000,
        InteriorVenetianBlind = 0x0040,
        RollerShutter = 0x0080,
        RollerShutterAdjustableSlats = 0x0081,
        RollerShutterWithProjection = 0x0082,
        VerticalExteriorAwning = 0x00CD,
        WindowOpener = 0x0100,
        WindowOpenerWithRainSensor = 0x0101,
        GarageDoorOpener = 0x0140,
        Light = 0x0180,
        LightSwitchOnOff = 0x01BA,
        GateOpener = 0x01CD,
        DoorLock = 0x0240,
        WindowLock = 0x0241,
        VerticalInteriorBlinds = 0x0280,
        DualRollerShutter = 0x0340,
        SwitchOnOff = 0x03C0,
        HorizontalAwning = 0x0400,
        ExteriorVenetianBlind = 0x0440,
        LouverBlind = 0x0480,
        CurtainTrack = 0x04C0,
        VentilationPoint = 0x0500,
        VentilationPointAirInlet = 0x0501,
        VentilationPointAirTransfer = 0x0502,
        VentilationPointAirOutlet = 0x0503,
        ExteriorHeating = 0x0540,
        SwingingShutters = 0x0600,
        SwingingShuttersIndependentLeaves = 0x0601,
    }
}

wire_enum! {
    pub enum NodeVariation: u8 {
        NotSet = 0,
        TopHung = 1,
        Kip = 2,
        FlatRoof = 3,
        SkyLight = 4,
    }
}

wire_enum! {
    pub enum NodeState: u8 {
        NonExecuting = 0,
        ErrorWhileExecution = 1,
        NotUsed = 2,
        WaitingForPower = 3,
        Executing = 4,
        Done = 5,
        StateUnknown = 255,
    }
}

wire_enum! {
    pub enum PowerMode: u8 {
        AlwaysAlive = 0,
        LowPowerMode = 1,
    }
}

wire_enum! {
    /// Main parameter or one of the 16 functional parameters.
    pub enum ParameterType: u8 {
        MainParameter = 0x00,
        FunctionalParameter01 = 0x01,
        FunctionalParameter02 = 0x02,
        FunctionalParameter03 = 0x03,
        FunctionalParameter04 = 0x04,
        FunctionalParameter05 = 0x05,
        FunctionalParameter06 = 0x06,
        FunctionalParameter07 = 0x07,
        FunctionalParameter08 = 0x08,
        FunctionalParameter09 = 0x09,
        FunctionalParameter10 = 0x0A,
        FunctionalParameter11 = 0x0B,
        FunctionalParameter12 = 0x0C,
        FunctionalParameter13 = 0x0D,
        FunctionalParameter14 = 0x0E,
        FunctionalParameter15 = 0x0F,
        FunctionalParameter16 = 0x10,
        NotUsed = 0xFF,
    }
}

impl ParameterType {
    /// Index of the parameter: 0 for the main parameter, 1..=16 for functional ones.
    pub fn index(self) -> Option<u8> {
        match self {
            Self::NotUsed => None,
            other => Some(other as u8),
        }
    }
}

wire_enum! {
    pub enum RunState: u8 {
        Completed = 0,
        Failed = 1,
        Active = 2,
    }
}

wire_enum! {
    pub enum RunStateOwner: u8 {
        User = 0x01,
        Rain = 0x02,
        Timer = 0x03,
        Ups = 0x05,
        Saac = 0x08,
        Wind = 0x09,
        Myself = 0x0A,
        AutomaticCycle = 0x0B,
        Emergency = 0x0C,
        Unknown = 0xFF,
    }
}

wire_enum! {
    /// Status reply of a failed or limited command run.
    pub enum RunStateError: u8 {
        UnknownStatusReply = 0x00,
        CommandCompletedOk = 0x01,
        NoContact = 0x02,
        ManuallyOperated = 0x03,
        Blocked = 0x04,
        WrongSystemkey = 0x05,
        PriorityLevelLocked = 0x06,
        ReachedWrongPosition = 0x07,
        ErrorDuringExecution = 0x08,
        NoExecution = 0x09,
        Calibrating = 0x0A,
        PowerConsumptionTooHigh = 0x0B,
        PowerConsumptionTooLow = 0x0C,
        LockPositionOpen = 0x0D,
        MotionTimeTooLongCommunicationEnded = 0x0E,
        ThermalProtection = 0x0F,
        ProductNotOperational = 0x10,
        FilterMaintenanceNeeded = 0x11,
        BatteryLevel = 0x12,
        TargetModified = 0x13,
        ModeNotImplemented = 0x14,
        CommandIncompatibleToMovement = 0x15,
        UserAction = 0x16,
        DeadBoltError = 0x17,
        AutomaticCycleEngaged = 0x18,
        WrongLoadConnected = 0x19,
        ColourNotReachable = 0x1A,
        TargetNotReachable = 0x1B,
        BadIndexReceived = 0x1C,
        CommandOverruled = 0x1D,
        NodeWaitingForPower = 0x1E,
        InformationCode = 0xDF,
        ParameterLimited = 0xE0,
        LimitationByLocalUser = 0xE1,
        LimitationByUser = 0xE2,
        LimitationByRain = 0xE3,
        LimitationByTimer = 0xE4,
        LimitationByUps = 0xE6,
        LimitationByUnknownDevice = 0xE7,
        LimitationBySaac = 0xEA,
        LimitationByWind = 0xEB,
        LimitationByMyself = 0xEC,
        LimitationByAutomaticCycle = 0xED,
        LimitationByEmergency = 0xEE,
    }
}

wire_enum! {
    pub enum GroupType: u8 {
        User = 0,
        Room = 1,
        House = 2,
    }
}

wire_enum! {
    /// Reply state of node, group and scene information requests.
    pub enum InformationRequestState: u8 {
        RequestAccepted = 0,
        RequestRejected = 1,
        RequestRejectedInvalidId = 2,
    }
}

wire_enum! {
    pub enum NodeCommandRequestState: u8 {
        RequestRejected = 0,
        RequestAccepted = 1,
    }
}

wire_enum! {
    pub enum SceneCommandRequestState: u8 {
        RequestAccepted = 0,
        RequestRejectedInvalidId = 1,
        RequestRejected = 2,
    }
}

wire_enum! {
    pub enum GroupCommandRequestState: u8 {
        RequestAccepted = 0,
        GroupIdError = 1,
        SessionError = 2,
        BusyError = 3,
        GroupTypeError = 4,
        UndefinedError = 5,
        ParameterError = 6,
    }
}

wire_enum! {
    /// Kind of change reported for a group or scene.
    pub enum ChangeType: u8 {
        Deleted = 0,
        Modified = 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagram::WireEnum;

    #[test]
    fn test_from_raw_and_name() {
        assert_eq!(NodeType::from_raw(0x0101), Some(NodeType::WindowOpenerWithRainSensor));
        assert_eq!(NodeType::from_raw(0x0102), None);
        assert_eq!(NodeType::WIDTH, 2);
        assert_eq!(CommandPriority::WIDTH, 1);
        assert_eq!(CommandPriority::UserLevel1.raw(), 2);
        assert_eq!(NodeState::StateUnknown.to_string(), "StateUnknown");
    }

    #[test]
    fn test_parse_ignores_case() {
        assert_eq!("userlevel1".parse::<CommandPriority>(), Ok(CommandPriority::UserLevel1));
        assert_eq!("FAST".parse::<NodeVelocity>(), Ok(NodeVelocity::Fast));
        assert!("warp".parse::<NodeVelocity>().is_err());
    }

    #[test]
    fn test_parameter_index() {
        assert_eq!(ParameterType::MainParameter.index(), Some(0));
        assert_eq!(ParameterType::FunctionalParameter16.index(), Some(16));
        assert_eq!(ParameterType::NotUsed.index(), None);
    }
}
