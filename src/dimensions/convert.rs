//! Projection of a [`DeviceRecord`] into [`Dimensions`] and back.
//!
//! Plain text and boolean fields are described once in the tables below so
//! that [`project`] and [`revert`] cannot drift apart. Enum-valued fields are
//! spelled out in both directions.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use log::debug;

use super::labels::{DeviceRecord, HardwareState};
use super::{sanitize, Dimensions, LabelEnum, TRUE};

const HARDWARE_PREFIX: &str = "HARDWARE_";

const KEY_DUT_STATE: &str = "dut_state";
const KEY_POOL: &str = "label-pool";
const KEY_PHASE: &str = "label-phase";
const KEY_OS_TYPE: &str = "label-os_type";
const KEY_EC_TYPE: &str = "label-ec_type";
const KEY_CTS_ABI: &str = "label-cts_abi";
const KEY_CTS_CPU: &str = "label-cts_cpu";
const KEY_CR50_PHASE: &str = "label-cr50_phase";
const KEY_LICENSE: &str = "label-license";
const KEY_CARRIER: &str = "label-carrier";
const KEY_VIDEO_ACCELERATION: &str = "label-video_acceleration";
const KEY_CHAMELEON_TYPE: &str = "label-chameleon_type";
const KEY_SERVO_STATE: &str = "label-servo_state";
const KEY_WORKING_BTPEER: &str = "label-working_bluetooth_btpeer";
const KEY_SIM_COUNT: &str = "label-sim_count";

const ENUM_KEYS: &[&str] = &[
    KEY_DUT_STATE,
    KEY_POOL,
    KEY_PHASE,
    KEY_OS_TYPE,
    KEY_EC_TYPE,
    KEY_CTS_ABI,
    KEY_CTS_CPU,
    KEY_CR50_PHASE,
    KEY_LICENSE,
    KEY_CARRIER,
    KEY_VIDEO_ACCELERATION,
    KEY_CHAMELEON_TYPE,
    KEY_SERVO_STATE,
    KEY_WORKING_BTPEER,
    KEY_SIM_COUNT,
];

struct TextField {
    key: &'static str,
    get: fn(&DeviceRecord) -> &String,
    get_mut: fn(&mut DeviceRecord) -> &mut String,
}

struct FlagField {
    key: &'static str,
    get: fn(&DeviceRecord) -> bool,
    get_mut: fn(&mut DeviceRecord) -> &mut bool,
}

struct HardwareField {
    key: &'static str,
    get: fn(&DeviceRecord) -> HardwareState,
    get_mut: fn(&mut DeviceRecord) -> &mut HardwareState,
}

macro_rules! text {
    ($key:literal, $($field:ident).+) => {
        TextField {
            key: $key,
            get: |d| &d.$($field).+,
            get_mut: |d| &mut d.$($field).+,
        }
    };
}

macro_rules! flag {
    ($key:literal, $($field:ident).+) => {
        FlagField {
            key: $key,
            get: |d| d.$($field).+,
            get_mut: |d| &mut d.$($field).+,
        }
    };
}

macro_rules! hardware {
    ($key:literal, $($field:ident).+) => {
        HardwareField {
            key: $key,
            get: |d| d.$($field).+,
            get_mut: |d| &mut d.$($field).+,
        }
    };
}

static TEXT_FIELDS: &[TextField] = &[
    text!("dut_id", id),
    text!("dut_name", hostname),
    text!("hwid", hwid),
    text!("serial_number", serial_number),
    text!("label-board", board),
    text!("label-model", model),
    text!("label-sku", sku),
    text!("label-device-sku", device_sku),
    text!("label-brand", brand),
    text!("label-platform", platform),
    text!("label-reference_design", reference_design),
    text!("label-variant", variant),
    text!("label-wifi_chip", wifi_chip),
    text!("label-cr50_ro_keyid", cr50_ro_keyid),
    text!("label-cr50_ro_version", cr50_ro_version),
    text!("label-cr50_rw_keyid", cr50_rw_keyid),
    text!("label-cr50_rw_version", cr50_rw_version),
    text!("label-graphics", capabilities.graphics),
    text!("label-gpu_family", capabilities.gpu_family),
    text!("label-modem", capabilities.modem),
    text!("label-power", capabilities.power),
    text!("label-storage", capabilities.storage),
    text!("label-telephony", capabilities.telephony),
    text!("label-servo_type", peripherals.servo_type),
];

static FLAG_FIELDS: &[FlagField] = &[
    flag!("label-arc", arc),
    flag!("label-device-stable", stable),
    flag!("label-atrus", capabilities.atrus),
    flag!("label-bluetooth", capabilities.bluetooth),
    flag!("label-detachablebase", capabilities.detachablebase),
    flag!("label-fingerprint", capabilities.fingerprint),
    flag!("label-flashrom", capabilities.flashrom),
    flag!("label-hotwording", capabilities.hotwording),
    flag!("label-internal_display", capabilities.internal_display),
    flag!("label-lucidsleep", capabilities.lucidsleep),
    flag!("label-touchpad", capabilities.touchpad),
    flag!("label-touchscreen", capabilities.touchscreen),
    flag!("label-webcam", capabilities.webcam),
    flag!("label-audio_board", peripherals.audio_board),
    flag!("label-audio_box", peripherals.audio_box),
    flag!("label-audio_loopback_dongle", peripherals.audio_loopback_dongle),
    flag!("label-camerabox", peripherals.camerabox),
    flag!("label-chameleon", peripherals.chameleon),
    flag!("label-conductive", peripherals.conductive),
    flag!("label-huddly", peripherals.huddly),
    flag!("label-mimo", peripherals.mimo),
    flag!("label-router_802_11ax", peripherals.router_802_11ax),
    flag!("label-servo", peripherals.servo),
    flag!("label-smart_usbhub", peripherals.smart_usbhub),
    flag!("label-stylus", peripherals.stylus),
    flag!("label-wificell", peripherals.wificell),
];

static HARDWARE_FIELDS: &[HardwareField] = &[
    hardware!("label-servo_usb_state", peripherals.servo_usb_state),
    hardware!("label-storage_state", peripherals.storage_state),
    hardware!("label-battery_state", peripherals.battery_state),
    hardware!("label-wifi_state", peripherals.wifi_state),
    hardware!("label-bluetooth_state", peripherals.bluetooth_state),
];

/// Keys owned by a record field; free-form attributes may not use them.
static RESERVED_KEYS: LazyLock<BTreeSet<&'static str>> = LazyLock::new(|| {
    TEXT_FIELDS
        .iter()
        .map(|f| f.key)
        .chain(FLAG_FIELDS.iter().map(|f| f.key))
        .chain(HARDWARE_FIELDS.iter().map(|f| f.key))
        .chain(ENUM_KEYS.iter().copied())
        .collect()
});

/// Whether `key` is produced from a record field rather than an attribute.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(key)
}

fn put(dims: &mut Dimensions, key: &str, values: Vec<String>) {
    if !values.is_empty() {
        dims.entry(key.to_string()).or_default().extend(values);
    }
}

fn put_enum<E: LabelEnum>(dims: &mut Dimensions, key: &str, value: E) {
    put_enums(dims, key, &[value]);
}

fn put_enums<E: LabelEnum>(dims: &mut Dimensions, key: &str, values: &[E]) {
    let rendered = values
        .iter()
        .filter(|value| !value.is_unknown())
        .map(|value| value.as_str().to_string())
        .collect();
    put(dims, key, rendered);
}

fn put_count(dims: &mut Dimensions, key: &str, count: u32) {
    if count > 0 {
        put(dims, key, vec![count.to_string()]);
    }
}

/// Flatten a device record into scheduler dimensions.
pub fn project(record: &DeviceRecord) -> Dimensions {
    let mut dims = Dimensions::new();

    for field in TEXT_FIELDS {
        let value = (field.get)(record);
        if !value.is_empty() {
            put(&mut dims, field.key, vec![value.clone()]);
        }
    }
    for field in FLAG_FIELDS {
        if (field.get)(record) {
            put(&mut dims, field.key, vec![TRUE.to_string()]);
        }
    }
    for field in HARDWARE_FIELDS {
        let state = (field.get)(record);
        if !state.is_unknown() {
            let name = state.as_str();
            let value = name.strip_prefix(HARDWARE_PREFIX).unwrap_or(name);
            put(&mut dims, field.key, vec![value.to_string()]);
        }
    }

    put_enum(&mut dims, KEY_DUT_STATE, record.dut_state);
    put_enum(&mut dims, KEY_PHASE, record.phase);
    put_enum(&mut dims, KEY_OS_TYPE, record.os_type);
    put_enum(&mut dims, KEY_EC_TYPE, record.ec_type);
    put_enum(&mut dims, KEY_CR50_PHASE, record.cr50_phase);
    put_enum(&mut dims, KEY_CARRIER, record.capabilities.carrier);
    put_enum(&mut dims, KEY_SERVO_STATE, record.peripherals.servo_state);
    put_enums(&mut dims, KEY_CTS_ABI, &record.cts_abi);
    put_enums(&mut dims, KEY_CTS_CPU, &record.cts_cpu);
    put_enums(&mut dims, KEY_LICENSE, &record.licenses);
    put_enums(
        &mut dims,
        KEY_VIDEO_ACCELERATION,
        &record.capabilities.video_acceleration,
    );
    put_enums(
        &mut dims,
        KEY_CHAMELEON_TYPE,
        &record.peripherals.chameleon_type,
    );

    put_enums(&mut dims, KEY_POOL, &record.critical_pools);
    put(&mut dims, KEY_POOL, record.self_serve_pools.clone());

    // One value per peer so a request can ask for "at least k".
    let peers = record.peripherals.working_bluetooth_btpeer;
    put(
        &mut dims,
        KEY_WORKING_BTPEER,
        (1..=peers).map(|n| n.to_string()).collect(),
    );
    put_count(&mut dims, KEY_SIM_COUNT, record.peripherals.sim_count);

    for (key, values) in &record.attributes {
        if is_reserved(key) {
            debug!("Ignoring attribute {} shadowed by a label", key);
            continue;
        }
        put(&mut dims, key, values.clone());
    }

    sanitize(&mut dims);
    dims
}

fn take_enum<E: LabelEnum>(rest: &mut Dimensions, key: &str) -> E {
    take_enums(rest, key).into_iter().next().unwrap_or(E::ALL[0])
}

fn take_enums<E: LabelEnum>(rest: &mut Dimensions, key: &str) -> Vec<E> {
    rest.remove(key)
        .unwrap_or_default()
        .iter()
        .filter_map(|value| {
            let parsed = E::parse(value).filter(|v| !v.is_unknown());
            if parsed.is_none() {
                debug!("Ignoring unrecognized {} value {:?}", key, value);
            }
            parsed
        })
        .collect()
}

fn take_count(rest: &mut Dimensions, key: &str) -> u32 {
    rest.remove(key)
        .unwrap_or_default()
        .iter()
        .filter_map(|value| value.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// Rebuild a device record from scheduler dimensions.
///
/// Keys that belong to no record field are kept as attributes. Values that
/// do not parse are dropped.
pub fn revert(dims: &Dimensions) -> DeviceRecord {
    let mut record = DeviceRecord::default();
    let mut rest = dims.clone();

    for field in TEXT_FIELDS {
        if let Some(values) = rest.remove(field.key) {
            if let Some(first) = values.into_iter().find(|v| !v.is_empty()) {
                *(field.get_mut)(&mut record) = first;
            }
        }
    }
    for field in FLAG_FIELDS {
        if let Some(values) = rest.remove(field.key) {
            *(field.get_mut)(&mut record) = values.iter().any(|v| v == TRUE);
        }
    }
    for field in HARDWARE_FIELDS {
        if let Some(values) = rest.remove(field.key) {
            let state = values
                .iter()
                .find_map(|v| HardwareState::parse(&format!("{}{}", HARDWARE_PREFIX, v)));
            *(field.get_mut)(&mut record) = state.unwrap_or_default();
        }
    }

    record.dut_state = take_enum(&mut rest, KEY_DUT_STATE);
    record.phase = take_enum(&mut rest, KEY_PHASE);
    record.os_type = take_enum(&mut rest, KEY_OS_TYPE);
    record.ec_type = take_enum(&mut rest, KEY_EC_TYPE);
    record.cr50_phase = take_enum(&mut rest, KEY_CR50_PHASE);
    record.capabilities.carrier = take_enum(&mut rest, KEY_CARRIER);
    record.peripherals.servo_state = take_enum(&mut rest, KEY_SERVO_STATE);
    record.cts_abi = take_enums(&mut rest, KEY_CTS_ABI);
    record.cts_cpu = take_enums(&mut rest, KEY_CTS_CPU);
    record.licenses = take_enums(&mut rest, KEY_LICENSE);
    record.capabilities.video_acceleration = take_enums(&mut rest, KEY_VIDEO_ACCELERATION);
    record.peripherals.chameleon_type = take_enums(&mut rest, KEY_CHAMELEON_TYPE);

    for pool in rest.remove(KEY_POOL).unwrap_or_default() {
        match super::labels::CriticalPool::parse(&pool) {
            Some(critical) if !critical.is_unknown() => record.critical_pools.push(critical),
            _ if pool.is_empty() => {}
            _ => record.self_serve_pools.push(pool),
        }
    }

    record.peripherals.working_bluetooth_btpeer = take_count(&mut rest, KEY_WORKING_BTPEER);
    record.peripherals.sim_count = take_count(&mut rest, KEY_SIM_COUNT);

    record.attributes = rest;
    record
}
