//! CLI command implementations.

pub(crate) mod publish;
pub(crate) mod validate;

pub(crate) use publish::PublishArgs;
pub(crate) use validate::ValidateArgs;
