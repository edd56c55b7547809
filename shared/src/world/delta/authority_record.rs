use crate::Authority;

/// Authority of one (entity, component) pair at the start of a batch, plus
/// whether it dropped to not-authoritative at any point during it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthorityRecord {
    pub start: Authority,
    pub passed_through_not_authoritative: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuthorityEvents {
    pub gained: bool,
    pub lost: bool,
    pub lost_temporarily: bool,
}

impl AuthorityRecord {
    pub fn new(start: Authority) -> Self {
        Self {
            start,
            passed_through_not_authoritative: false,
        }
    }

    pub fn observe(&mut self, authority: Authority) {
        if authority == Authority::NotAuthoritative {
            self.passed_through_not_authoritative = true;
        }
    }

    /// Net authority events between the start of the batch and `end`.
    pub fn events(&self, end: Authority) -> AuthorityEvents {
        use crate::Authority::*;

        let mut events = AuthorityEvents::default();
        match (self.start, end) {
            (NotAuthoritative, Authoritative) => events.gained = true,
            (NotAuthoritative, AuthorityLossImminent) => {
                events.gained = true;
                events.lost_temporarily = true;
            }
            (Authoritative, NotAuthoritative) | (AuthorityLossImminent, NotAuthoritative) => {
                events.lost = true
            }
            (Authoritative, AuthorityLossImminent) => events.lost_temporarily = true,
            (AuthorityLossImminent, Authoritative) => events.gained = true,
            (Authoritative, Authoritative) | (AuthorityLossImminent, AuthorityLossImminent) => {
                events.lost_temporarily = self.passed_through_not_authoritative
            }
            (NotAuthoritative, NotAuthoritative) => {}
        }
        events
    }
}
