use shardview_shared::{CommandIndex, CommandRequestOp, EntityId, EntityView, RequestId};

/// Reference to an object living on some entity. `offset` picks the object
/// among those the entity owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    pub entity_id: EntityId,
    pub offset: u32,
}

impl ObjectRef {
    pub fn new(entity_id: EntityId, offset: u32) -> Self {
        Self { entity_id, offset }
    }
}

/// The opaque call itself, addressed to one function of the target object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcPayload {
    pub offset: u32,
    pub index: CommandIndex,
    pub data: Vec<u8>,
}

/// Everything needed to run one incoming cross call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossCallParams {
    pub target: ObjectRef,
    pub request_id: RequestId,
    pub payload: RpcPayload,
    /// Other objects the call refers to; each must be in the view for the
    /// call to run without being forced.
    pub object_refs: Vec<ObjectRef>,
    pub timeout_millis: Option<u32>,
}

impl CrossCallParams {
    pub fn unresolved_refs<'a>(&'a self, view: &'a EntityView) -> impl Iterator<Item = &'a ObjectRef> {
        self.object_refs
            .iter()
            .filter(move |object_ref| !view.has_entity(object_ref.entity_id))
    }
}

/// Application side of the cross-call queue: decodes incoming command
/// requests and runs them.
pub trait RpcExecutor {
    /// Decodes a command request into a cross call, or `None` if the request
    /// is not one.
    fn try_retrieve(&mut self, request: &CommandRequestOp, view: &EntityView) -> Option<CrossCallParams>;

    /// Runs the call. Returning `false` leaves it queued for another attempt.
    fn execute(&mut self, params: &CrossCallParams) -> bool;
}
