use std::sync::Arc;

use tracing::trace;

use super::resource_controller::ControllerInner;
use crate::Resource;
use crate::ResourceChange;
use crate::ResourceEventHandler;
use crate::SynchronizedReplica;

/// Replica callback deriving the affected stream keys of each change
pub(super) struct ChangeHandler<S: SynchronizedReplica> {
    controller: Arc<ControllerInner<S>>,
}

impl<S: SynchronizedReplica> ChangeHandler<S> {
    pub(super) fn new(controller: Arc<ControllerInner<S>>) -> Self {
        Self { controller }
    }
}

impl<S: SynchronizedReplica> ResourceEventHandler<S::Object> for ChangeHandler<S> {
    fn on_change(
        &self,
        change: &ResourceChange<S::Object>,
    ) {
        let obj = change.identity_source();
        trace!(
            kind = %self.controller.kind,
            namespace = obj.namespace(),
            name = obj.name(),
            "Replica change received"
        );
        self.controller.schedule_for(obj);
    }
}
