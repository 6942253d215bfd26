//! PubSub / TopicSubscription traits - live topic interface

use bytes::Bytes;

use crate::ContractError;

/// Publish/subscribe-by-topic collaborator
#[trait_variant::make(PubSub: Send)]
pub trait LocalPubSub {
    /// Subscription handle returned by `subscribe`
    type Subscription: TopicSubscription + Send + 'static;

    /// Publish one message; succeeds even when nobody listens
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), ContractError>;

    /// Open a subscription on `topic`
    async fn subscribe(&self, topic: &str) -> Result<Self::Subscription, ContractError>;
}

/// One open subscription
#[trait_variant::make(TopicSubscription: Send)]
pub trait LocalTopicSubscription {
    /// Topic this subscription listens on
    fn topic(&self) -> &str;

    /// Next raw message, `None` once the subscription has ended
    async fn next_message(&mut self) -> Option<Bytes>;

    /// End the subscription
    ///
    /// # Errors
    /// Returns an error when the subscription was already ended.
    async fn unsubscribe(&mut self) -> Result<(), ContractError>;
}
