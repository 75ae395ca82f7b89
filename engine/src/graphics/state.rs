use kiln_core::gpu::{BufferInfo, ResourceState, TextureInfo, TextureUsage};
use parking_lot::Mutex;

/// The access state a resource was last transitioned to, as recorded into a command list.
pub struct ResourceStateTracker {
    state: Mutex<ResourceState>,
}

impl ResourceStateTracker {
    pub fn new(initial_state: ResourceState) -> Self {
        Self {
            state: Mutex::new(initial_state),
        }
    }

    pub fn current(&self) -> ResourceState {
        *self.state.lock()
    }

    /// Moves the resource into `new_state`.
    /// `record_barrier` receives the old and new state and is called only if they differ.
    /// The tracker stays locked while it runs. Returns whether a barrier was recorded.
    pub fn request<F>(&self, new_state: ResourceState, record_barrier: F) -> bool
        where F: FnOnce(ResourceState, ResourceState) {
        let mut state = self.state.lock();
        if *state == new_state {
            return false;
        }
        record_barrier(*state, new_state);
        *state = new_state;
        true
    }
}

pub fn initial_buffer_state(_info: &BufferInfo) -> ResourceState {
    ResourceState::COPY_DEST
}

pub fn initial_texture_state(info: &TextureInfo) -> ResourceState {
    if info.usage.contains(TextureUsage::RENDER_TARGET) {
        ResourceState::RENDER_TARGET
    } else if info.usage.contains(TextureUsage::DEPTH_STENCIL) {
        ResourceState::DEPTH_WRITE
    } else {
        ResourceState::COPY_DEST
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use kiln_core::gpu::{Format, SampleCount};
    use proptest::prelude::*;

    use super::*;

    const STATES: [ResourceState; 8] = [
        ResourceState::COPY_DEST,
        ResourceState::COPY_SOURCE,
        ResourceState::RENDER_TARGET,
        ResourceState::UNORDERED_ACCESS,
        ResourceState::VERTEX_AND_CONSTANT_BUFFER,
        ResourceState::INDEX_BUFFER,
        ResourceState::ALL_SHADER_RESOURCE,
        ResourceState::RESOLVE_DEST,
    ];

    #[test]
    fn repeated_requests_are_idempotent() {
        let tracker = ResourceStateTracker::new(ResourceState::COPY_DEST);
        let mut barriers = Vec::new();
        assert!(!tracker.request(ResourceState::COPY_DEST, |old, new| barriers.push((old, new))));
        assert!(tracker.request(ResourceState::COPY_SOURCE, |old, new| barriers.push((old, new))));
        assert!(!tracker.request(ResourceState::COPY_SOURCE, |old, new| barriers.push((old, new))));
        assert_eq!(barriers, vec![(ResourceState::COPY_DEST, ResourceState::COPY_SOURCE)]);
        assert_eq!(tracker.current(), ResourceState::COPY_SOURCE);
    }

    #[test]
    fn textures_start_in_their_target_state() {
        let mut info = TextureInfo {
            format: Format::RGBA8UNorm,
            width: 4,
            height: 4,
            mip_levels: 1,
            array_length: 1,
            samples: SampleCount::Samples1,
            usage: TextureUsage::RENDER_TARGET | TextureUsage::SAMPLED,
        };
        assert_eq!(initial_texture_state(&info), ResourceState::RENDER_TARGET);
        info.usage = TextureUsage::DEPTH_STENCIL;
        assert_eq!(initial_texture_state(&info), ResourceState::DEPTH_WRITE);
        info.usage = TextureUsage::SAMPLED | TextureUsage::COPY_DST;
        assert_eq!(initial_texture_state(&info), ResourceState::COPY_DEST);
    }

    proptest! {
        #[test]
        fn barrier_count_matches_state_changes(initial in 0usize..STATES.len(), requests in prop::collection::vec(0usize..STATES.len(), 0..64)) {
            let tracker = ResourceStateTracker::new(STATES[initial]);
            let recorded = RefCell::new(Vec::<(ResourceState, ResourceState)>::new());

            let mut expected = 0usize;
            let mut previous = STATES[initial];
            for request in &requests {
                let state = STATES[*request];
                if state != previous {
                    expected += 1;
                }
                previous = state;
                tracker.request(state, |old, new| recorded.borrow_mut().push((old, new)));
            }

            let recorded = recorded.into_inner();
            prop_assert_eq!(recorded.len(), expected);
            for (old, new) in &recorded {
                prop_assert_ne!(old, new);
            }
            for pair in recorded.windows(2) {
                prop_assert_eq!(pair[0].1, pair[1].0);
            }
            prop_assert_eq!(tracker.current(), previous);
        }
    }
}
