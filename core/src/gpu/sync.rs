/// Completed value reported by a fence once the device has been removed.
pub const DEVICE_REMOVED_FENCE_VALUE: u64 = u64::MAX;

pub trait Fence {
  /// The last value the GPU has completed. Returns [`DEVICE_REMOVED_FENCE_VALUE`] if the device is gone.
  unsafe fn value(&self) -> u64;
  /// Blocks until the fence reaches `value` or the device is removed.
  unsafe fn await_value(&self, value: u64);
}
