//! Polymorphic nodes: one node type with ordered alternative
//! implementations; the first morph that composes wins.

use futures::future::BoxFuture;

use super::{ComposeError, Composer, Node, Scope};

/// One alternative implementation of a polymorphic node.
pub struct Morph<T> {
    pub name: &'static str,
    pub compose: for<'a> fn(&'a mut Composer) -> BoxFuture<'a, Result<T, ComposeError>>,
}

/// A node with multiple implementations tried in declaration order.
///
/// Each morph is an independent sub-resolution: a failed morph's sessions
/// are rolled back before the next one runs. The winning value is memoized
/// per event when the node's scope is [`Scope::PerEvent`] (handled by the
/// composer's store, like any other node value).
pub trait Polymorphic: Sized + Send + Sync + 'static {
    const SCOPE: Scope = Scope::PerCall;

    fn morphs() -> Vec<Morph<Self>>;
}

#[async_trait::async_trait]
impl<T: Polymorphic> Node for T {
    const SCOPE: Scope = <T as Polymorphic>::SCOPE;

    async fn compose(composer: &mut Composer) -> Result<Self, ComposeError> {
        let mut last = String::from("no implementations declared");
        for morph in Self::morphs() {
            let mark = composer.session_mark();
            match (morph.compose)(composer).await {
                Ok(value) => return Ok(value),
                // A cycle is a programming error, not a "wrong morph".
                Err(err @ ComposeError::Cycle(_)) => return Err(err),
                Err(err) => {
                    tracing::debug!(
                        node = std::any::type_name::<T>(),
                        morph = morph.name,
                        error = %err,
                        "morph did not compose"
                    );
                    composer.rollback_sessions(mark);
                    last = format!("{}: {err}", morph.name);
                }
            }
        }
        Err(ComposeError::NoMorph {
            node: std::any::type_name::<T>(),
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Api, Token};
    use crate::bot::bound::BoundUpdate;
    use crate::bot::dispatch::context::Context;
    use crate::client::MockClient;
    use crate::node::{compose_nodes, NodeSpec};
    use crate::types::Update;
    use std::sync::Arc;

    struct Picky;

    #[async_trait::async_trait]
    impl Node for Picky {
        async fn compose(_composer: &mut Composer) -> Result<Self, ComposeError> {
            Err(ComposeError::failed("never composes"))
        }
    }

    struct Pick(&'static str);

    impl Polymorphic for Pick {
        fn morphs() -> Vec<Morph<Self>> {
            vec![
                Morph {
                    name: "via_picky",
                    compose: |composer: &mut Composer| {
                        Box::pin(async move {
                            let _ = composer.resolve::<Picky>().await?;
                            Ok(Pick("first"))
                        })
                    },
                },
                Morph {
                    name: "fallback",
                    compose: |_: &mut Composer| Box::pin(async move { Ok(Pick("second")) }),
                },
            ]
        }
    }

    #[derive(Debug)]
    struct NoPick;

    impl Polymorphic for NoPick {
        fn morphs() -> Vec<Morph<Self>> {
            vec![Morph {
                name: "refuses",
                compose: |_: &mut Composer| Box::pin(async move { Err(ComposeError::failed("no")) }),
            }]
        }
    }

    async fn compose_one<N: Node>() -> Result<Arc<N>, ComposeError> {
        let api = Api::new(Token::new("1:t").unwrap(), Arc::new(MockClient::new()));
        let update = Arc::new(Update::default());
        let bound = BoundUpdate::new(update.clone(), api.clone());
        let mut ctx = Context::new(update.clone());
        let mut col = compose_nodes(&[NodeSpec::of::<N>()], &mut ctx, &api, &update, &bound).await?;
        let value = col.get::<N>().ok_or(ComposeError::Missing("missing"))?;
        col.close_all();
        Ok(value)
    }

    /// **Scenario**: The first failing morph is skipped; the first success wins.
    #[tokio::test]
    async fn first_success_wins() {
        let picked = compose_one::<Pick>().await.unwrap();
        assert_eq!(picked.0, "second");
    }

    /// **Scenario**: When no morph composes, the node fails with NoMorph.
    #[tokio::test]
    async fn all_morphs_fail() {
        let err = compose_one::<NoPick>().await.unwrap_err();
        assert!(matches!(err, ComposeError::NoMorph { .. }), "{err}");
    }
}
