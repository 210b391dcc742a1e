//! Command identifiers of the KLF-200 API.

use super::WireEnum;

wire_enum! {
    /// 16-bit command identifier, the closed set the appliance understands.
    pub enum Command: u16 {
        ErrorNtf = 0x0000,
        RebootReq = 0x0001,
        RebootCfm = 0x0002,
        SetFactoryDefaultReq = 0x0003,
        SetFactoryDefaultCfm = 0x0004,
        GetVersionReq = 0x0008,
        GetVersionCfm = 0x0009,
        GetProtocolVersionReq = 0x000A,
        GetProtocolVersionCfm = 0x000B,
        GetStateReq = 0x000C,
        GetStateCfm = 0x000D,
        LeaveLearnStateReq = 0x000E,
        LeaveLearnStateCfm = 0x000F,
        GetNetworkSetupReq = 0x00E0,
        GetNetworkSetupCfm = 0x00E1,
        SetNetworkSetupReq = 0x00E2,
        SetNetworkSetupCfm = 0x00E3,
        CsGetSystemtableDataReq = 0x0100,
        CsGetSystemtableDataCfm = 0x0101,
        CsGetSystemtableDataNtf = 0x0102,
        CsDiscoverNodesReq = 0x0103,
        CsDiscoverNodesCfm = 0x0104,
        CsDiscoverNodesNtf = 0x0105,
        CsRemoveNodesReq = 0x0106,
        CsRemoveNodesCfm = 0x0107,
        CsVirginStateReq = 0x0108,
        CsVirginStateCfm = 0x0109,
        CsControllerCopyReq = 0x010A,
        CsControllerCopyCfm = 0x010B,
        CsControllerCopyNtf = 0x010C,
        CsControllerCopyCancelNtf = 0x010D,
        CsReceiveKeyReq = 0x010E,
        CsReceiveKeyCfm = 0x010F,
        CsReceiveKeyNtf = 0x0110,
        CsPgcJobNtf = 0x0111,
        CsSystemTableUpdateNtf = 0x0112,
        CsGenerateNewKeyReq = 0x0113,
        CsGenerateNewKeyCfm = 0x0114,
        CsGenerateNewKeyNtf = 0x0115,
        CsRepairKeyReq = 0x0116,
        CsRepairKeyCfm = 0x0117,
        CsRepairKeyNtf = 0x0118,
        CsActivateConfigurationModeReq = 0x0119,
        CsActivateConfigurationModeCfm = 0x011A,
        GetNodeInformationReq = 0x0200,
        GetNodeInformationCfm = 0x0201,
        GetNodeInformationNtf = 0x0210,
        GetAllNodesInformationReq = 0x0202,
        GetAllNodesInformationCfm = 0x0203,
        GetAllNodesInformationNtf = 0x0204,
        GetAllNodesInformationFinishedNtf = 0x0205,
        SetNodeVariationReq = 0x0206,
        SetNodeVariationCfm = 0x0207,
        SetNodeNameReq = 0x0208,
        SetNodeNameCfm = 0x0209,
        SetNodeVelocityReq = 0x020A,
        SetNodeVelocityCfm = 0x020B,
        NodeInformationChangedNtf = 0x020C,
        NodeStatePositionChangedNtf = 0x0211,
        SetNodeOrderAndPlacementReq = 0x020D,
        SetNodeOrderAndPlacementCfm = 0x020E,
        GetGroupInformationReq = 0x0220,
        GetGroupInformationCfm = 0x0221,
        GetGroupInformationNtf = 0x0230,
        SetGroupInformationReq = 0x0222,
        SetGroupInformationCfm = 0x0223,
        GroupInformationChangedNtf = 0x0224,
        DeleteGroupReq = 0x0225,
        DeleteGroupCfm = 0x0226,
        NewGroupReq = 0x0227,
        NewGroupCfm = 0x0228,
        GetAllGroupsInformationReq = 0x0229,
        GetAllGroupsInformationCfm = 0x022A,
        GetAllGroupsInformationNtf = 0x022B,
        GetAllGroupsInformationFinishedNtf = 0x022C,
        GroupDeletedNtf = 0x022D,
        HouseStatusMonitorEnableReq = 0x0240,
        HouseStatusMonitorEnableCfm = 0x0241,
        HouseStatusMonitorDisableReq = 0x0242,
        HouseStatusMonitorDisableCfm = 0x0243,
        CommandSendReq = 0x0300,
        CommandSendCfm = 0x0301,
        CommandRunStatusNtf = 0x0302,
        CommandRemainingTimeNtf = 0x0303,
        SessionFinishedNtf = 0x0304,
        StatusRequestReq = 0x0305,
        StatusRequestCfm = 0x0306,
        StatusRequestNtf = 0x0307,
        WinkSendReq = 0x0308,
        WinkSendCfm = 0x0309,
        WinkSendNtf = 0x030A,
        SetLimitationReq = 0x0310,
        SetLimitationCfm = 0x0311,
        GetLimitationStatusReq = 0x0312,
        GetLimitationStatusCfm = 0x0313,
        LimitationStatusNtf = 0x0314,
        ModeSendReq = 0x0320,
        ModeSendCfm = 0x0321,
        ModeSendNtf = 0x0322,
        InitializeSceneReq = 0x0400,
        InitializeSceneCfm = 0x0401,
        InitializeSceneNtf = 0x0402,
        InitializeSceneCancelReq = 0x0403,
        InitializeSceneCancelCfm = 0x0404,
        RecordSceneReq = 0x0405,
        RecordSceneCfm = 0x0406,
        RecordSceneNtf = 0x0407,
        DeleteSceneReq = 0x0408,
        DeleteSceneCfm = 0x0409,
        RenameSceneReq = 0x040A,
        RenameSceneCfm = 0x040B,
        GetSceneListReq = 0x040C,
        GetSceneListCfm = 0x040D,
        GetSceneListNtf = 0x040E,
        GetSceneInformationReq = 0x040F,
        GetSceneInformationCfm = 0x0410,
        GetSceneInformationNtf = 0x0411,
        ActivateSceneReq = 0x0412,
        ActivateSceneCfm = 0x0413,
        StopSceneReq = 0x0415,
        StopSceneCfm = 0x0416,
        SceneInformationChangedNtf = 0x0419,
        ActivateProductgroupReq = 0x0447,
        ActivateProductgroupCfm = 0x0448,
        ActivateProductgroupNtf = 0x0449,
        GetContactInputLinkListReq = 0x0460,
        GetContactInputLinkListCfm = 0x0461,
        SetContactInputLinkReq = 0x0462,
        SetContactInputLinkCfm = 0x0463,
        RemoveContactInputLinkReq = 0x0464,
        RemoveContactInputLinkCfm = 0x0465,
        GetActivationLogHeaderReq = 0x0500,
        GetActivationLogHeaderCfm = 0x0501,
        ClearActivationLogReq = 0x0502,
        ClearActivationLogCfm = 0x0503,
        GetActivationLogLineReq = 0x0504,
        GetActivationLogLineCfm = 0x0505,
        ActivationLogUpdatedNtf = 0x0506,
        GetMultipleActivationLogLinesReq = 0x0507,
        GetMultipleActivationLogLinesNtf = 0x0508,
        GetMultipleActivationLogLinesCfm = 0x0509,
        SetUtcReq = 0x2000,
        SetUtcCfm = 0x2001,
        RtcSetTimeZoneReq = 0x2002,
        RtcSetTimeZoneCfm = 0x2003,
        GetLocalTimeReq = 0x2004,
        GetLocalTimeCfm = 0x2005,
        PasswordEnterReq = 0x3000,
        PasswordEnterCfm = 0x3001,
        PasswordChangeReq = 0x3002,
        PasswordChangeCfm = 0x3003,
        PasswordChangeNtf = 0x3004,    }
}

impl Command {
    /// Whether the command is a request sent by the host.
    pub fn is_request(self) -> bool {
        self.name().ends_with("Req")
    }

    /// Whether the command is a notification sent spontaneously by the appliance.
    pub fn is_notification(self) -> bool {
        self.name().ends_with("Ntf")
    }
}
