use crate::{ComponentId, EntityId, EntityViewElement};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryConstraint {
    EntityId(EntityId),
    Component(ComponentId),
    And(Vec<QueryConstraint>),
    Or(Vec<QueryConstraint>),
    Not(Box<QueryConstraint>),
}

impl QueryConstraint {
    /// Evaluates the constraint against a locally known entity.
    pub fn matches(&self, entity_id: EntityId, element: &EntityViewElement) -> bool {
        match self {
            QueryConstraint::EntityId(id) => *id == entity_id,
            QueryConstraint::Component(component_id) => element.has_component(*component_id),
            QueryConstraint::And(constraints) => constraints
                .iter()
                .all(|constraint| constraint.matches(entity_id, element)),
            QueryConstraint::Or(constraints) => constraints
                .iter()
                .any(|constraint| constraint.matches(entity_id, element)),
            QueryConstraint::Not(constraint) => !constraint.matches(entity_id, element),
        }
    }
}

/// A remote query over the whole world, not only the local view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityQuery {
    pub constraint: QueryConstraint,
    /// `None` requests every component of each matching entity.
    pub result_components: Option<Vec<ComponentId>>,
}

impl EntityQuery {
    pub fn new(constraint: QueryConstraint) -> Self {
        Self {
            constraint,
            result_components: None,
        }
    }

    pub fn with_result_components(mut self, component_ids: Vec<ComponentId>) -> Self {
        self.result_components = Some(component_ids);
        self
    }
}
