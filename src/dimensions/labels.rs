//! Structured inventory record of one device.
//!
//! Records are read from JSON. Enum fields use their canonical names
//! (`"phase": "PHASE_DVT"`); omitted fields take their unset value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::label_enum;
use super::state::DutState;

label_enum! {
    /// Build phase of the device.
    pub enum Phase {
        Invalid => "PHASE_INVALID",
        Evt => "PHASE_EVT",
        Evt2 => "PHASE_EVT2",
        Dvt => "PHASE_DVT",
        Dvt2 => "PHASE_DVT2",
        Pvt => "PHASE_PVT",
        Pvt2 => "PHASE_PVT2",
        Pvt3 => "PHASE_PVT3",
        Mp => "PHASE_MP",
    }
}

label_enum! {
    pub enum OsType {
        Invalid => "OS_TYPE_INVALID",
        Android => "OS_TYPE_ANDROID",
        Cros => "OS_TYPE_CROS",
        Jetstream => "OS_TYPE_JETSTREAM",
        Moblab => "OS_TYPE_MOBLAB",
        Labstation => "OS_TYPE_LABSTATION",
    }
}

label_enum! {
    pub enum EcType {
        Invalid => "EC_TYPE_INVALID",
        ChromeOs => "EC_TYPE_CHROME_OS",
    }
}

label_enum! {
    pub enum CtsAbi {
        Invalid => "CTS_ABI_INVALID",
        Arm => "CTS_ABI_ARM",
        X86 => "CTS_ABI_X86",
    }
}

label_enum! {
    pub enum CtsCpu {
        Invalid => "CTS_CPU_INVALID",
        Arm => "CTS_CPU_ARM",
        X86 => "CTS_CPU_X86",
    }
}

label_enum! {
    /// Pools managed by the lab rather than by device owners.
    pub enum CriticalPool {
        Invalid => "DUT_POOL_INVALID",
        Cq => "DUT_POOL_CQ",
        Bvt => "DUT_POOL_BVT",
        Suites => "DUT_POOL_SUITES",
        Cts => "DUT_POOL_CTS",
        CtsPerbuild => "DUT_POOL_CTS_PERBUILD",
        Continuous => "DUT_POOL_CONTINUOUS",
        ArcPresubmit => "DUT_POOL_ARC_PRESUBMIT",
        Quota => "DUT_POOL_QUOTA",
    }
}

label_enum! {
    pub enum Cr50Phase {
        Invalid => "CR50_PHASE_INVALID",
        PrePvt => "CR50_PHASE_PREPVT",
        Pvt => "CR50_PHASE_PVT",
    }
}

label_enum! {
    pub enum LicenseType {
        Unspecified => "LICENSE_TYPE_UNSPECIFIED",
        Windows10Pro => "LICENSE_TYPE_WINDOWS_10_PRO",
        MsOfficeStandard => "LICENSE_TYPE_MS_OFFICE_STANDARD",
    }
}

label_enum! {
    pub enum Carrier {
        Invalid => "CARRIER_INVALID",
        Att => "CARRIER_ATT",
        Tmobile => "CARRIER_TMOBILE",
        Verizon => "CARRIER_VERIZON",
        Sprint => "CARRIER_SPRINT",
        TestEsim => "CARRIER_TESTESIM",
        Esim => "CARRIER_ESIM",
        MultiSim => "CARRIER_MULTISIM",
        RoamSim => "CARRIER_ROAMSIM",
    }
}

label_enum! {
    pub enum VideoAcceleration {
        Invalid => "VIDEO_ACCELERATION_INVALID",
        H264 => "VIDEO_ACCELERATION_H264",
        EncH264 => "VIDEO_ACCELERATION_ENC_H264",
        Vp8 => "VIDEO_ACCELERATION_VP8",
        EncVp8 => "VIDEO_ACCELERATION_ENC_VP8",
        Vp9 => "VIDEO_ACCELERATION_VP9",
        EncVp9 => "VIDEO_ACCELERATION_ENC_VP9",
        Vp9_2 => "VIDEO_ACCELERATION_VP9_2",
        EncVp9_2 => "VIDEO_ACCELERATION_ENC_VP9_2",
        H265 => "VIDEO_ACCELERATION_H265",
        EncH265 => "VIDEO_ACCELERATION_ENC_H265",
        Mjpg => "VIDEO_ACCELERATION_MJPG",
        EncMjpg => "VIDEO_ACCELERATION_ENC_MJPG",
    }
}

label_enum! {
    pub enum ChameleonType {
        Invalid => "CHAMELEON_TYPE_INVALID",
        BtHid => "CHAMELEON_TYPE_BT_HID",
        Dp => "CHAMELEON_TYPE_DP",
        DpHdmi => "CHAMELEON_TYPE_DP_HDMI",
        Vga => "CHAMELEON_TYPE_VGA",
        Hdmi => "CHAMELEON_TYPE_HDMI",
        BtBleHid => "CHAMELEON_TYPE_BT_BLE_HID",
        BtA2dpSink => "CHAMELEON_TYPE_BT_A2DP_SINK",
        BtPeer => "CHAMELEON_TYPE_BT_PEER",
    }
}

label_enum! {
    /// State of the servo attached to the device.
    pub enum PeripheralState {
        Unknown => "UNKNOWN",
        Working => "WORKING",
        MissingConfig => "MISSING_CONFIG",
        WrongConfig => "WRONG_CONFIG",
        NotConnected => "NOT_CONNECTED",
        NoSsh => "NO_SSH",
        Broken => "BROKEN",
        NeedReplacement => "NEED_REPLACEMENT",
    }
}

label_enum! {
    /// Health of a hardware component; projected without the `HARDWARE_`
    /// prefix.
    pub enum HardwareState {
        Unknown => "HARDWARE_UNKNOWN",
        Normal => "HARDWARE_NORMAL",
        Acceptable => "HARDWARE_ACCEPTABLE",
        NeedReplacement => "HARDWARE_NEED_REPLACEMENT",
        NotDetected => "HARDWARE_NOT_DETECTED",
    }
}

/// Hardware capabilities of the device itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub atrus: bool,
    pub bluetooth: bool,
    pub detachablebase: bool,
    pub fingerprint: bool,
    pub flashrom: bool,
    pub hotwording: bool,
    pub internal_display: bool,
    pub lucidsleep: bool,
    pub touchpad: bool,
    pub touchscreen: bool,
    pub webcam: bool,
    pub graphics: String,
    pub gpu_family: String,
    pub modem: String,
    pub power: String,
    pub storage: String,
    pub telephony: String,
    pub carrier: Carrier,
    pub video_acceleration: Vec<VideoAcceleration>,
}

/// Equipment attached to the device in the lab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Peripherals {
    pub audio_board: bool,
    pub audio_box: bool,
    pub audio_loopback_dongle: bool,
    pub camerabox: bool,
    pub chameleon: bool,
    pub conductive: bool,
    pub huddly: bool,
    pub mimo: bool,
    pub router_802_11ax: bool,
    pub servo: bool,
    pub smart_usbhub: bool,
    pub stylus: bool,
    pub wificell: bool,
    pub servo_type: String,
    pub servo_state: PeripheralState,
    pub chameleon_type: Vec<ChameleonType>,
    pub servo_usb_state: HardwareState,
    pub storage_state: HardwareState,
    pub battery_state: HardwareState,
    pub wifi_state: HardwareState,
    pub bluetooth_state: HardwareState,
    /// Number of working bluetooth peers.
    pub working_bluetooth_btpeer: u32,
    pub sim_count: u32,
}

/// One physical device as recorded by the inventory service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRecord {
    pub id: String,
    pub hostname: String,
    pub hwid: String,
    pub serial_number: String,
    pub dut_state: DutState,

    pub board: String,
    pub model: String,
    pub sku: String,
    pub device_sku: String,
    pub brand: String,
    pub platform: String,
    pub reference_design: String,
    pub variant: String,
    pub wifi_chip: String,
    pub arc: bool,
    /// Device is trusted to give stable results.
    pub stable: bool,
    pub phase: Phase,
    pub os_type: OsType,
    pub ec_type: EcType,
    pub cts_abi: Vec<CtsAbi>,
    pub cts_cpu: Vec<CtsCpu>,
    pub critical_pools: Vec<CriticalPool>,
    pub self_serve_pools: Vec<String>,
    pub cr50_phase: Cr50Phase,
    pub cr50_ro_keyid: String,
    pub cr50_ro_version: String,
    pub cr50_rw_keyid: String,
    pub cr50_rw_version: String,
    pub licenses: Vec<LicenseType>,
    pub capabilities: Capabilities,
    pub peripherals: Peripherals,

    /// Free-form dimensions carried through unchanged.
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl DeviceRecord {
    /// Parse a record from a JSON object.
    pub fn from_json(bytes: &[u8]) -> crate::error::Result<Self> {
        let decode_error = |message: String| crate::error::Error::Decode {
            message: format!("cannot decode device record: {}", message),
        };
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| decode_error(e.to_string()))?;
        if !value.is_object() {
            return Err(decode_error("expected a JSON object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| decode_error(e.to_string()))
    }
}
