use serde::{Deserialize, Serialize};

/// Who is holding a token.
///
/// `Child` tokens are play-mode tokens: issued by a parent, bound to one of
/// that parent's children and limited to the play and rewards views.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Child,
}
