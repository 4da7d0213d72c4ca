//! Access policy
//!
//! A static table keyed by (resource, action) yields a [`Rule`]; [`authorize`]
//! evaluates it against the acting [`Principal`] and, for object-level checks,
//! the owner of the target object.

use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity { pub user_id: Uuid, pub is_staff: bool }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Principal { Anonymous, User(Identity) }

impl Principal {
    pub fn user(user_id: Uuid) -> Self { Self::User(Identity { user_id, is_staff: false }) }
    pub fn staff(user_id: Uuid) -> Self { Self::User(Identity { user_id, is_staff: true }) }

    pub fn identity(&self) -> Option<&Identity> {
        match self { Self::Anonymous => None, Self::User(identity) => Some(identity) }
    }

    pub fn is_staff(&self) -> bool { self.identity().is_some_and(|i| i.is_staff) }

    /// Owner filter for scoped queries: `None` for staff (sees everything).
    pub fn scope(&self) -> Option<Uuid> {
        self.identity().filter(|i| !i.is_staff).map(|i| i.user_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource { Product, Review, Order, Collection, Favorite }

impl Resource {
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Review => "review",
            Self::Order => "order",
            Self::Collection => "collection",
            Self::Favorite => "favorite",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action { Read, Create, Update, Delete }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    Anyone,
    Authenticated,
    Staff,
    /// `hidden`: a non-owner is told the object does not exist.
    OwnerOrStaff { hidden: bool },
    Owner { hidden: bool },
    Unsupported,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    #[error("authentication credentials were not provided")]
    Unauthenticated,
    #[error("you do not have permission to perform this action")]
    Forbidden,
    #[error("not found")]
    Hidden,
}

pub const fn rule(resource: Resource, action: Action) -> Rule {
    use Action::*;
    use Resource::*;
    match (resource, action) {
        (Product | Collection, Read) => Rule::Anyone,
        (Product | Collection, Create | Update | Delete) => Rule::Staff,
        (Review, Read) => Rule::Anyone,
        (Review, Create) => Rule::Authenticated,
        (Review, Update | Delete) => Rule::OwnerOrStaff { hidden: false },
        (Order, Create) => Rule::Authenticated,
        (Order, Read | Update | Delete) => Rule::OwnerOrStaff { hidden: true },
        (Favorite, Create) => Rule::Authenticated,
        (Favorite, Read | Delete) => Rule::Owner { hidden: true },
        (Favorite, Update) => Rule::Unsupported,
    }
}

/// `owner` is `None` for a collection-level check made before any object is loaded.
pub fn authorize(resource: Resource, action: Action, principal: &Principal, owner: Option<Uuid>) -> Result<(), Denied> {
    let rule = rule(resource, action);
    if rule == Rule::Anyone { return Ok(()); }
    let identity = principal.identity().ok_or(Denied::Unauthenticated)?;
    match rule {
        Rule::Anyone | Rule::Authenticated => Ok(()),
        Rule::Staff if identity.is_staff => Ok(()),
        Rule::Staff | Rule::Unsupported => Err(Denied::Forbidden),
        Rule::OwnerOrStaff { .. } if identity.is_staff => Ok(()),
        Rule::OwnerOrStaff { hidden } | Rule::Owner { hidden } => match owner {
            None => Ok(()),
            Some(owner) if owner == identity.user_id => Ok(()),
            Some(_) if hidden => Err(Denied::Hidden),
            Some(_) => Err(Denied::Forbidden),
        },
    }
}
