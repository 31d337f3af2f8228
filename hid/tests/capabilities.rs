mod common;

use common::{MockDevice, MockTransport, CONTAINER_ID, PP_DATA_MAGIC};
use hid::{
    Capability, Context, ContainerId, DescriptorReconstruct, Error, ExclusiveMode, LocationId,
    OpenExclusive, SysDeviceOpen, INTERFACE_ANY,
};

fn devices() -> MockTransport {
    MockTransport::new()
        .with_device(MockDevice::new("mock/0", 0x04d8, 0x003f).interface(0))
        .with_device(MockDevice::new("mock/1", 0x04d8, 0x003f).interface(2))
}

#[test]
fn missing_capabilities_are_reported() {
    let ctx = Context::new(devices());
    assert!(!ctx.supports(Capability::ContainerId));

    assert_eq!(
        ctx.set_open_exclusive(false),
        Err(Error::NotSupported(Capability::OpenExclusive))
    );
    assert_eq!(
        ctx.open_sys_device(3, INTERFACE_ANY).unwrap_err(),
        Error::NotSupported(Capability::WrapSysDevice)
    );

    let device = ctx.open_first(0, 0).unwrap();
    assert_eq!(
        device.location_id(),
        Err(Error::NotSupported(Capability::LocationId))
    );
    let err = device.container_id().unwrap_err();
    assert_eq!(err.to_string(), "container ID is not supported by the loaded transport");
}

#[test]
fn exclusive_mode_applies_to_later_opens() {
    let ctx = Context::new(devices().with_capability(Capability::OpenExclusive));
    assert!(ctx.open_exclusive().unwrap());
    let first = ctx.open_first(0, 0).unwrap();

    ctx.set_open_exclusive(false).unwrap();
    assert!(!ctx.open_exclusive().unwrap());
    let second = ctx.open_first(0, 0).unwrap();

    assert!(first.is_open_exclusive().unwrap());
    assert!(!second.is_open_exclusive().unwrap());
}

#[test]
fn location_id() {
    let ctx = Context::new(devices().with_capability(Capability::LocationId));
    let device = ctx.open_first(0, 0).unwrap();
    assert_eq!(device.location_id().unwrap(), 0x1410_0000);
}

#[test]
fn wraps_system_devices_by_interface() {
    let ctx = Context::new(devices().with_capability(Capability::WrapSysDevice));
    let any = ctx.open_sys_device(7, INTERFACE_ANY).unwrap();
    assert_eq!(any.device_info().unwrap().path, "mock/0");

    let second = ctx.open_sys_device(7, 2).unwrap();
    assert_eq!(second.device_info().unwrap().interface_number, 2);
    assert_eq!(ctx.open_handles(), 2);

    let err = ctx.open_sys_device(-1, 0).unwrap_err();
    assert_eq!(err.to_string(), "invalid file descriptor");
}

#[test]
fn container_id() {
    let ctx = Context::new(devices().with_all_capabilities());
    let device = ctx.open_first(0, 0).unwrap();
    let guid = device.container_id().unwrap();
    assert_eq!(guid, CONTAINER_ID);
    assert_eq!(guid.to_string(), "6f1d2b61-d5a0-11cf-bfc7-444553540000");
}

#[test]
fn reconstructs_descriptors_from_opaque_data() {
    let ctx = Context::new(devices().with_capability(Capability::ReconstructDescriptor));
    let mut pp_data = PP_DATA_MAGIC.to_vec();
    pp_data.extend_from_slice(&[0x05, 0x01, 0x09, 0x06]);

    let mut buf = [0u8; 64];
    let n = ctx.reconstruct_descriptor(&pp_data, &mut buf).unwrap();
    assert_eq!(&buf[..n], &[0x05, 0x01, 0x09, 0x06]);

    let err = ctx.reconstruct_descriptor(b"garbage", &mut buf).unwrap_err();
    assert_eq!(err, Error::Transport("invalid preparsed data".into()));
    assert_eq!(ctx.reconstruct_descriptor(&pp_data, &mut []), Err(Error::EmptyBuffer));
}
