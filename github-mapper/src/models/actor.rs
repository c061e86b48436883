//! Users, bots and organizations, and the git identities commits are attributed to.

use serde::Serialize;

use crate::decode::Decode;
use crate::decode::DecodeContext;
use crate::decode::Nullable;
use crate::error::DecodeError;
use crate::json_ext::Value;
use crate::models::Timestamp;
use crate::registry::EntityShape;
use crate::registry::FieldDescriptor;
use crate::registry::UnionShape;
use crate::registry::VariantShape;

pub static LOGIN: FieldDescriptor = FieldDescriptor::scalar("login", "login");
pub static AVATAR_URL: FieldDescriptor = FieldDescriptor::scalar("avatar_url", "avatarUrl");
pub static URL: FieldDescriptor = FieldDescriptor::scalar("url", "url");

static USER_NAME: FieldDescriptor = FieldDescriptor::scalar("name", "name").nullable();
static USER_EMAIL: FieldDescriptor = FieldDescriptor::scalar("email", "email");
static ORGANIZATION_NAME: FieldDescriptor = FieldDescriptor::scalar("name", "name").nullable();
static MANNEQUIN_EMAIL: FieldDescriptor = FieldDescriptor::scalar("email", "email")
    .alias("mannequinEmail")
    .nullable();

pub static ACTOR: UnionShape = UnionShape {
    name: "actor",
    common: &[&LOGIN, &AVATAR_URL, &URL],
    variants: &[
        VariantShape {
            typename: "User",
            fields: &[&USER_NAME, &USER_EMAIL],
        },
        VariantShape {
            typename: "Organization",
            fields: &[&ORGANIZATION_NAME],
        },
        VariantShape {
            typename: "Bot",
            fields: &[],
        },
        VariantShape {
            typename: "Mannequin",
            fields: &[&MANNEQUIN_EMAIL],
        },
    ],
};

/// Something that can author a pull request or a review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub login: String,
    pub avatar_url: String,
    pub url: String,
    pub kind: ActorKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ActorKind {
    User { name: Option<String>, email: String },
    Organization { name: Option<String> },
    Bot,
    Mannequin { email: Option<String> },
    /// A member type this catalogue does not know about.
    Unknown { typename: String },
}

impl Decode for Actor {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        let kind = match ctx.discriminator(node)? {
            "User" => ActorKind::User {
                name: ctx.required(node, &USER_NAME)?,
                email: ctx.required(node, &USER_EMAIL)?,
            },
            "Organization" => ActorKind::Organization {
                name: ctx.required(node, &ORGANIZATION_NAME)?,
            },
            "Bot" => ActorKind::Bot,
            "Mannequin" => ActorKind::Mannequin {
                email: ctx.required(node, &MANNEQUIN_EMAIL)?,
            },
            other => ActorKind::Unknown {
                typename: other.to_string(),
            },
        };
        Ok(Self {
            login: ctx.required(node, &LOGIN)?,
            avatar_url: ctx.required(node, &AVATAR_URL)?,
            url: ctx.required(node, &URL)?,
            kind,
        })
    }
}

static BASIC_USER_NAME: FieldDescriptor = FieldDescriptor::scalar("name", "name").nullable();

pub static BASIC_USER: EntityShape = EntityShape {
    name: "basic_user",
    typename: "User",
    base: None,
    fields: &[&LOGIN, &BASIC_USER_NAME, &URL],
};

/// The account behind a git identity or a signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BasicUser {
    pub login: String,
    pub name: Option<String>,
    pub url: String,
}

impl Decode for BasicUser {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            login: ctx.required(node, &LOGIN)?,
            name: ctx.required(node, &BASIC_USER_NAME)?,
            url: ctx.required(node, &URL)?,
        })
    }
}

static GIT_ACTOR_NAME: FieldDescriptor = FieldDescriptor::scalar("name", "name").nullable();
static GIT_ACTOR_EMAIL: FieldDescriptor = FieldDescriptor::scalar("email", "email").nullable();
static GIT_ACTOR_DATE: FieldDescriptor = FieldDescriptor::scalar("date", "date").nullable();
static GIT_ACTOR_USER: FieldDescriptor =
    FieldDescriptor::object("user", "user", &BASIC_USER).nullable();

pub static GIT_ACTOR: EntityShape = EntityShape {
    name: "git_actor",
    typename: "GitActor",
    base: None,
    fields: &[
        &GIT_ACTOR_NAME,
        &GIT_ACTOR_EMAIL,
        &GIT_ACTOR_DATE,
        &GIT_ACTOR_USER,
    ],
};

/// An author or committer as recorded in git.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GitActor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Nullable<Timestamp>,
    /// The account the email resolves to, if any.
    pub user: Option<BasicUser>,
}

impl Decode for GitActor {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            name: ctx.required(node, &GIT_ACTOR_NAME)?,
            email: ctx.required(node, &GIT_ACTOR_EMAIL)?,
            date: ctx.required(node, &GIT_ACTOR_DATE)?,
            user: ctx.required(node, &GIT_ACTOR_USER)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::json_ext::Object;

    fn decode<T: Decode>(value: Value) -> Result<T, DecodeError> {
        let variables = Object::new();
        T::decode(&value, &mut DecodeContext::new(&variables))
    }

    #[test]
    fn actor_variants() {
        let actor: Actor = decode(json!({
            "__typename": "User",
            "login": "octocat",
            "avatarUrl": "https://avatars.githubusercontent.com/u/583231",
            "url": "https://github.com/octocat",
            "name": "The Octocat",
            "email": ""
        }))
        .unwrap();
        assert_eq!(
            actor.kind,
            ActorKind::User {
                name: Some("The Octocat".to_string()),
                email: String::new()
            }
        );

        let actor: Actor = decode(json!({
            "__typename": "Mannequin",
            "login": "ghost-import",
            "avatarUrl": "https://avatars.githubusercontent.com/u/1",
            "url": "https://github.com/ghost-import",
            "mannequinEmail": null
        }))
        .unwrap();
        assert_eq!(actor.kind, ActorKind::Mannequin { email: None });
    }

    #[test]
    fn unknown_actor_keeps_common_fields() {
        let actor: Actor = decode(json!({
            "__typename": "EnterpriseUserAccount",
            "login": "octo-enterprise",
            "avatarUrl": "https://avatars.githubusercontent.com/u/2",
            "url": "https://github.com/enterprises/octo"
        }))
        .unwrap();
        assert_eq!(actor.login, "octo-enterprise");
        assert_eq!(
            actor.kind,
            ActorKind::Unknown {
                typename: "EnterpriseUserAccount".to_string()
            }
        );
    }

    #[test]
    fn git_actor_without_account() {
        let actor: GitActor = decode(json!({
            "name": "Mona",
            "email": "mona@example.com",
            "date": null
        }))
        .unwrap();
        assert_eq!(actor.name.as_deref(), Some("Mona"));
        assert!(actor.date.is_null());
        assert_eq!(actor.user, None);
    }
}
