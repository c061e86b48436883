//! Commits, in a basic form embedded in other records and a full form with gated fields.

use serde::Serialize;

use crate::decode::Decode;
use crate::decode::DecodeContext;
use crate::decode::Nullable;
use crate::error::DecodeError;
use crate::json_ext::Value;
use crate::models::Timestamp;
use crate::models::actor::BASIC_USER;
use crate::models::actor::BasicUser;
use crate::models::actor::GIT_ACTOR;
use crate::models::actor::GitActor;
use crate::registry::EntityShape;
use crate::registry::FieldDescriptor;
use crate::registry::UnionShape;
use crate::registry::VariantShape;

pub static SHA: FieldDescriptor = FieldDescriptor::scalar("sha", "oid").alias("sha");
pub static SHORT_SHA: FieldDescriptor =
    FieldDescriptor::scalar("short_sha", "abbreviatedOid").alias("shortSha");
pub static AUTHORED_DATE: FieldDescriptor =
    FieldDescriptor::scalar("authored_date", "authoredDate");
pub static AUTHOR: FieldDescriptor =
    FieldDescriptor::object("author", "author", &GIT_ACTOR).nullable();
pub static COMMITTER: FieldDescriptor =
    FieldDescriptor::object("committer", "committer", &GIT_ACTOR).nullable();
pub static MESSAGE: FieldDescriptor = FieldDescriptor::scalar("message", "message");
pub static URL: FieldDescriptor = FieldDescriptor::scalar("url", "url");

/// Fields of a commit wherever it is embedded; also the selection of the `Commit` member of
/// a git object.
pub static BASIC_COMMIT_FIELDS: [&FieldDescriptor; 7] = [
    &SHA,
    &SHORT_SHA,
    &AUTHORED_DATE,
    &AUTHOR,
    &COMMITTER,
    &MESSAGE,
    &URL,
];

pub static BASIC_COMMIT: EntityShape = EntityShape {
    name: "basic_commit",
    typename: "Commit",
    base: None,
    fields: &BASIC_COMMIT_FIELDS,
};

pub static ADDITIONS: FieldDescriptor =
    FieldDescriptor::scalar("additions", "additions").include_if("includeCommitAdditions");
pub static DELETIONS: FieldDescriptor =
    FieldDescriptor::scalar("deletions", "deletions").include_if("includeCommitDeletions");
pub static CHANGED_FILES: FieldDescriptor =
    FieldDescriptor::scalar("changed_files", "changedFilesIfAvailable")
        .alias("changedFiles")
        .include_if("includeCommitChangedFiles")
        .nullable();
pub static AUTHORED_BY_COMMITTER: FieldDescriptor =
    FieldDescriptor::scalar("authored_by_committer", "authoredByCommitter")
        .include_if("includeCommitAuthoredByCommitter");
pub static COMMITTED_DATE: FieldDescriptor =
    FieldDescriptor::scalar("committed_date", "committedDate")
        .include_if("includeCommitCommittedDate");
pub static COMMITTED_VIA_WEB: FieldDescriptor =
    FieldDescriptor::scalar("committed_via_web", "committedViaWeb")
        .include_if("includeCommitCommittedViaWeb");
pub static MESSAGE_HEADLINE: FieldDescriptor =
    FieldDescriptor::scalar("message_headline", "messageHeadline")
        .include_if("includeCommitMessageHeadline");
pub static SIGNATURE: FieldDescriptor =
    FieldDescriptor::union("signature", "signature", &SIGNATURE_SHAPE)
        .include_if("includeCommitSignature")
        .nullable();
pub static STATUS: FieldDescriptor = FieldDescriptor::object("status", "status", &STATUS_SHAPE)
    .include_if("includeCommitStatus")
    .nullable();
pub static TARBALL_URL: FieldDescriptor =
    FieldDescriptor::scalar("tarball_url", "tarballUrl").include_if("includeCommitTarballUrl");
pub static ZIPBALL_URL: FieldDescriptor =
    FieldDescriptor::scalar("zipball_url", "zipballUrl").include_if("includeCommitZipballUrl");
pub static TREE_URL: FieldDescriptor =
    FieldDescriptor::scalar("tree_url", "treeUrl").include_if("includeCommitTreeUrl");
pub static NODE_ID: FieldDescriptor = FieldDescriptor::scalar("node_id", "id")
    .alias("nodeId")
    .include_if("includeCommitNodeId");

pub static COMMIT: EntityShape = EntityShape {
    name: "commit",
    typename: "Commit",
    base: Some(&BASIC_COMMIT),
    fields: &[
        &ADDITIONS,
        &DELETIONS,
        &CHANGED_FILES,
        &AUTHORED_BY_COMMITTER,
        &COMMITTED_DATE,
        &COMMITTED_VIA_WEB,
        &MESSAGE_HEADLINE,
        &SIGNATURE,
        &STATUS,
        &TARBALL_URL,
        &ZIPBALL_URL,
        &TREE_URL,
        &NODE_ID,
    ],
};

/// A commit as embedded in branches and other records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BasicCommit {
    pub sha: String,
    pub short_sha: String,
    pub authored_date: Timestamp,
    pub author: Option<GitActor>,
    pub committer: Option<GitActor>,
    pub message: String,
    pub url: String,
}

impl Decode for BasicCommit {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            sha: ctx.required(node, &SHA)?,
            short_sha: ctx.required(node, &SHORT_SHA)?,
            authored_date: ctx.required(node, &AUTHORED_DATE)?,
            author: ctx.required(node, &AUTHOR)?,
            committer: ctx.required(node, &COMMITTER)?,
            message: ctx.required(node, &MESSAGE)?,
            url: ctx.required(node, &URL)?,
        })
    }
}

/// A commit with every optional field. Fields the query did not ask for hold their default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Commit {
    #[serde(flatten)]
    pub basic: BasicCommit,
    pub additions: i64,
    pub deletions: i64,
    /// `None` when the diff is too large for the API to count.
    pub changed_files: Option<i64>,
    pub authored_by_committer: bool,
    pub committed_date: Nullable<Timestamp>,
    pub committed_via_web: bool,
    pub message_headline: String,
    pub signature: Option<Signature>,
    pub status: Option<CommitStatus>,
    pub tarball_url: String,
    pub zipball_url: String,
    pub tree_url: String,
    pub node_id: String,
}

impl Decode for Commit {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let basic = BasicCommit::decode(value, ctx)?;
        let node = ctx.object(value)?;
        Ok(Self {
            basic,
            additions: ctx.field(node, &ADDITIONS)?,
            deletions: ctx.field(node, &DELETIONS)?,
            changed_files: ctx.field(node, &CHANGED_FILES)?,
            authored_by_committer: ctx.field(node, &AUTHORED_BY_COMMITTER)?,
            committed_date: ctx.field(node, &COMMITTED_DATE)?,
            committed_via_web: ctx.field(node, &COMMITTED_VIA_WEB)?,
            message_headline: ctx.field(node, &MESSAGE_HEADLINE)?,
            signature: ctx.field(node, &SIGNATURE)?,
            status: ctx.field(node, &STATUS)?,
            tarball_url: ctx.field(node, &TARBALL_URL)?,
            zipball_url: ctx.field(node, &ZIPBALL_URL)?,
            tree_url: ctx.field(node, &TREE_URL)?,
            node_id: ctx.field(node, &NODE_ID)?,
        })
    }
}

static STATUS_STATE: FieldDescriptor = FieldDescriptor::scalar("state", "state");

pub static STATUS_SHAPE: EntityShape = EntityShape {
    name: "commit_status",
    typename: "Status",
    base: None,
    fields: &[&STATUS_STATE],
};

/// Combined status of the checks run against a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitStatus {
    /// `SUCCESS`, `PENDING`, `FAILURE`, `ERROR` or `EXPECTED`.
    pub state: String,
}

impl Decode for CommitStatus {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        Ok(Self {
            state: ctx.required(node, &STATUS_STATE)?,
        })
    }
}

static SIGNATURE_EMAIL: FieldDescriptor = FieldDescriptor::scalar("email", "email");
static SIGNATURE_IS_VALID: FieldDescriptor = FieldDescriptor::scalar("is_valid", "isValid");
static SIGNATURE_STATE: FieldDescriptor = FieldDescriptor::scalar("state", "state");
static SIGNATURE_WAS_SIGNED_BY_GITHUB: FieldDescriptor =
    FieldDescriptor::scalar("was_signed_by_github", "wasSignedByGitHub");
static SIGNATURE_SIGNER: FieldDescriptor =
    FieldDescriptor::object("signer", "signer", &BASIC_USER).nullable();
static GPG_KEY_ID: FieldDescriptor = FieldDescriptor::scalar("key_id", "keyId").nullable();
static SSH_KEY_FINGERPRINT: FieldDescriptor =
    FieldDescriptor::scalar("key_fingerprint", "keyFingerprint").nullable();

pub static SIGNATURE_SHAPE: UnionShape = UnionShape {
    name: "git_signature",
    common: &[
        &SIGNATURE_EMAIL,
        &SIGNATURE_IS_VALID,
        &SIGNATURE_STATE,
        &SIGNATURE_WAS_SIGNED_BY_GITHUB,
        &SIGNATURE_SIGNER,
    ],
    variants: &[
        VariantShape {
            typename: "GpgSignature",
            fields: &[&GPG_KEY_ID],
        },
        VariantShape {
            typename: "SshSignature",
            fields: &[&SSH_KEY_FINGERPRINT],
        },
        VariantShape {
            typename: "SmimeSignature",
            fields: &[],
        },
    ],
};

/// The signature attached to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub email: String,
    pub is_valid: bool,
    pub state: String,
    pub was_signed_by_github: bool,
    pub signer: Option<BasicUser>,
    pub kind: SignatureKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum SignatureKind {
    Gpg { key_id: Option<String> },
    Ssh { key_fingerprint: Option<String> },
    Smime,
    Unknown { typename: String },
}

impl Decode for Signature {
    fn decode(value: &Value, ctx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let node = ctx.object(value)?;
        let kind = match ctx.discriminator(node)? {
            "GpgSignature" => SignatureKind::Gpg {
                key_id: ctx.required(node, &GPG_KEY_ID)?,
            },
            "SshSignature" => SignatureKind::Ssh {
                key_fingerprint: ctx.required(node, &SSH_KEY_FINGERPRINT)?,
            },
            "SmimeSignature" => SignatureKind::Smime,
            other => SignatureKind::Unknown {
                typename: other.to_string(),
            },
        };
        Ok(Self {
            email: ctx.required(node, &SIGNATURE_EMAIL)?,
            is_valid: ctx.required(node, &SIGNATURE_IS_VALID)?,
            state: ctx.required(node, &SIGNATURE_STATE)?,
            was_signed_by_github: ctx.required(node, &SIGNATURE_WAS_SIGNED_BY_GITHUB)?,
            signer: ctx.required(node, &SIGNATURE_SIGNER)?,
            kind,
        })
    }
}
