//! Strongly-typed identifiers (avoid mixing raw strings or UUIDs arbitrarily).

use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProviderOrganizationId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvitationId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AoOrgLinkId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CdOrgLinkId(pub Uuid);
