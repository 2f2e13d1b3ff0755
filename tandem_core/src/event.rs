// Copyright 2026 the Tandem Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree events, topics, and the per-subscriber event bus.
//!
//! Every mutation of a [`MapTree`](crate::map::MapTree) emits one or more
//! [`TreeEvent`]s. Each event is addressed to a [`Topic`]: the object that
//! raised it plus the kind of event. Subscribers (one per synchronizer)
//! register listeners on topics and receive a [`Delivery`] per matching
//! listener in their own inbox.
//!
//! # Delivery semantics
//!
//! The listener set of a topic is snapshotted at emit time. A listener
//! attached after an event was emitted does not receive it; a listener
//! revoked after emission still has its delivery queued. Consumers must
//! ignore deliveries whose [`ListenerKey`] they no longer own, which is what
//! makes revocation inside a handler safe.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::map::{CollectionId, FeatureId, NodeId, SourceId, SourceState};

/// A property of a layer node whose change is observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerProperty {
    /// Visibility flag.
    Visible,
    /// Local opacity.
    Opacity,
    /// Stacking key.
    ZIndex,
    /// Spatial extent.
    Extent,
    /// Attached data source.
    Source,
}

/// What kind of event a listener is interested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A node was inserted into the collection.
    CollectionAdd(CollectionId),
    /// A node was removed from the collection.
    CollectionRemove(CollectionId),
    /// The group's child collection was swapped for another instance.
    LayersReplaced(NodeId),
    /// Generic change notification on a node.
    Changed(NodeId),
    /// A specific property of a node changed.
    Property(NodeId, LayerProperty),
    /// A feature was added to the source.
    FeatureAdd(SourceId),
    /// A feature was removed from the source.
    FeatureRemove(SourceId),
    /// A feature of the source changed.
    FeatureChange(SourceId),
    /// The loading state of a raster source changed.
    SourceState(SourceId),
}

/// An event raised by the map tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEvent {
    /// `node` was inserted into `collection`.
    Added {
        /// Collection that changed.
        collection: CollectionId,
        /// Inserted node.
        node: NodeId,
    },
    /// `node` was removed from `collection`.
    Removed {
        /// Collection that changed.
        collection: CollectionId,
        /// Removed node.
        node: NodeId,
    },
    /// `group` now uses `current` instead of `previous` as its children.
    LayersReplaced {
        /// Group whose collection was swapped.
        group: NodeId,
        /// Collection in use before the swap.
        previous: CollectionId,
        /// Collection in use after the swap.
        current: CollectionId,
    },
    /// Something about `node` changed.
    Changed {
        /// Node that changed.
        node: NodeId,
    },
    /// `property` of `node` changed.
    PropertyChanged {
        /// Node that changed.
        node: NodeId,
        /// Which property.
        property: LayerProperty,
    },
    /// `feature` was added to `source`.
    FeatureAdded {
        /// Owning source.
        source: SourceId,
        /// New feature.
        feature: FeatureId,
    },
    /// `feature` was removed from `source`.
    FeatureRemoved {
        /// Owning source.
        source: SourceId,
        /// Removed feature (now stale).
        feature: FeatureId,
    },
    /// `feature` of `source` changed geometry.
    FeatureChanged {
        /// Owning source.
        source: SourceId,
        /// Changed feature.
        feature: FeatureId,
    },
    /// `source` moved to `state`.
    ///
    /// Emitted before the `Changed` notification of every node using the
    /// source.
    SourceStateChanged {
        /// Raster source.
        source: SourceId,
        /// New state.
        state: SourceState,
    },
}

impl TreeEvent {
    /// Returns the topic this event is addressed to.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match *self {
            Self::Added { collection, .. } => Topic::CollectionAdd(collection),
            Self::Removed { collection, .. } => Topic::CollectionRemove(collection),
            Self::LayersReplaced { group, .. } => Topic::LayersReplaced(group),
            Self::Changed { node } => Topic::Changed(node),
            Self::PropertyChanged { node, property } => Topic::Property(node, property),
            Self::FeatureAdded { source, .. } => Topic::FeatureAdd(source),
            Self::FeatureRemoved { source, .. } => Topic::FeatureRemove(source),
            Self::FeatureChanged { source, .. } => Topic::FeatureChange(source),
            Self::SourceStateChanged { source, .. } => Topic::SourceState(source),
        }
    }
}

/// Identifies one consumer of tree events (typically one synchronizer).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub(crate) u32);

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

/// A revocable listener registration.
///
/// Generational, so a key stays invalid after its slot is recycled.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl fmt::Debug for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerKey({}@gen{})", self.idx, self.generation)
    }
}

/// One queued event for one listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// The listener this delivery was queued for.
    pub key: ListenerKey,
    /// The event.
    pub event: TreeEvent,
}

#[derive(Clone, Copy, Debug)]
struct ListenerSlot {
    topic: Topic,
    subscriber: SubscriberId,
    generation: u32,
    live: bool,
}

/// Listener registrations and per-subscriber inboxes.
#[derive(Debug, Default)]
pub struct EventBus {
    slots: Vec<ListenerSlot>,
    free_list: Vec<u32>,
    by_topic: HashMap<Topic, Vec<u32>>,
    inboxes: Vec<VecDeque<Delivery>>,
    live: usize,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber with an empty inbox.
    pub fn subscribe(&mut self) -> SubscriberId {
        let id = u32::try_from(self.inboxes.len()).expect("subscriber count fits in u32");
        self.inboxes.push(VecDeque::new());
        SubscriberId(id)
    }

    /// Revokes every listener owned by `subscriber` and clears its inbox.
    ///
    /// The subscriber id itself stays valid and may register again.
    pub fn release(&mut self, subscriber: SubscriberId) {
        let owned: Vec<ListenerKey> = self
            .slots
            .iter()
            .zip(0_u32..)
            .filter(|(s, _)| s.live && s.subscriber == subscriber)
            .map(|(s, idx)| ListenerKey {
                idx,
                generation: s.generation,
            })
            .collect();
        for key in owned {
            self.unlisten(key);
        }
        self.inbox_mut(subscriber).clear();
    }

    /// Registers a listener for `topic` on behalf of `subscriber`.
    pub fn listen(&mut self, subscriber: SubscriberId, topic: Topic) -> ListenerKey {
        assert!(
            (subscriber.0 as usize) < self.inboxes.len(),
            "unknown subscriber {subscriber:?}"
        );
        let idx = if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.topic = topic;
            slot.subscriber = subscriber;
            slot.live = true;
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).expect("listener count fits in u32");
            self.slots.push(ListenerSlot {
                topic,
                subscriber,
                generation: 0,
                live: true,
            });
            idx
        };
        self.by_topic.entry(topic).or_default().push(idx);
        self.live += 1;
        ListenerKey {
            idx,
            generation: self.slots[idx as usize].generation,
        }
    }

    /// Revokes a listener. Returns `false` if the key was already revoked.
    pub fn unlisten(&mut self, key: ListenerKey) -> bool {
        if !self.is_listening(key) {
            return false;
        }
        let slot = &mut self.slots[key.idx as usize];
        slot.live = false;
        slot.generation += 1;
        let topic = slot.topic;
        if let Some(list) = self.by_topic.get_mut(&topic) {
            list.retain(|&i| i != key.idx);
            if list.is_empty() {
                self.by_topic.remove(&topic);
            }
        }
        self.free_list.push(key.idx);
        self.live -= 1;
        true
    }

    /// Returns whether `key` is still registered.
    #[must_use]
    pub fn is_listening(&self, key: ListenerKey) -> bool {
        self.slots
            .get(key.idx as usize)
            .is_some_and(|s| s.live && s.generation == key.generation)
    }

    /// Returns the topic `key` listens to, if it is still registered.
    #[must_use]
    pub fn topic_of(&self, key: ListenerKey) -> Option<Topic> {
        if self.is_listening(key) {
            Some(self.slots[key.idx as usize].topic)
        } else {
            None
        }
    }

    /// Returns the number of live listeners across all subscribers.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.live
    }

    /// Returns the number of live listeners owned by `subscriber`.
    #[must_use]
    pub fn listener_count_for(&self, subscriber: SubscriberId) -> usize {
        self.slots
            .iter()
            .filter(|s| s.live && s.subscriber == subscriber)
            .count()
    }

    /// Queues `event` for every listener currently registered on its topic.
    pub fn emit(&mut self, event: TreeEvent) {
        let Some(listeners) = self.by_topic.get(&event.topic()) else {
            return;
        };
        for &idx in listeners {
            let slot = self.slots[idx as usize];
            let delivery = Delivery {
                key: ListenerKey {
                    idx,
                    generation: slot.generation,
                },
                event,
            };
            self.inboxes[slot.subscriber.0 as usize].push_back(delivery);
        }
    }

    /// Pops the oldest delivery queued for `subscriber`.
    pub fn poll(&mut self, subscriber: SubscriberId) -> Option<Delivery> {
        self.inbox_mut(subscriber).pop_front()
    }

    /// Returns the number of deliveries waiting for `subscriber`.
    #[must_use]
    pub fn pending(&self, subscriber: SubscriberId) -> usize {
        self.inboxes
            .get(subscriber.0 as usize)
            .map_or(0, VecDeque::len)
    }

    fn inbox_mut(&mut self, subscriber: SubscriberId) -> &mut VecDeque<Delivery> {
        let len = self.inboxes.len();
        self.inboxes
            .get_mut(subscriber.0 as usize)
            .unwrap_or_else(|| panic!("unknown subscriber {subscriber:?} ({len} registered)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(idx: u32) -> NodeId {
        NodeId { idx, generation: 0 }
    }

    #[test]
    fn emit_reaches_only_matching_topic() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe();
        let key = bus.listen(sub, Topic::Changed(node(1)));
        bus.emit(TreeEvent::Changed { node: node(2) });
        assert_eq!(bus.pending(sub), 0);

        bus.emit(TreeEvent::Changed { node: node(1) });
        let d = bus.poll(sub).expect("delivery queued");
        assert_eq!(d.key, key);
        assert_eq!(d.event, TreeEvent::Changed { node: node(1) });
        assert!(bus.poll(sub).is_none());
    }

    #[test]
    fn unlisten_stops_future_deliveries() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe();
        let key = bus.listen(sub, Topic::Changed(node(1)));
        assert!(bus.unlisten(key));
        assert!(!bus.unlisten(key), "double revoke reports false");
        bus.emit(TreeEvent::Changed { node: node(1) });
        assert_eq!(bus.pending(sub), 0);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn recycled_slot_gets_fresh_generation() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe();
        let old = bus.listen(sub, Topic::Changed(node(1)));
        bus.unlisten(old);
        let new = bus.listen(sub, Topic::Changed(node(2)));
        assert_eq!(old.idx, new.idx);
        assert!(!bus.is_listening(old));
        assert!(bus.is_listening(new));
    }

    #[test]
    fn listener_set_is_snapshotted_at_emit_time() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe();
        bus.emit(TreeEvent::Changed { node: node(1) });
        let _late = bus.listen(sub, Topic::Changed(node(1)));
        assert_eq!(bus.pending(sub), 0, "late listener misses earlier event");
    }

    #[test]
    fn subscribers_have_separate_inboxes() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.listen(a, Topic::Changed(node(1)));
        bus.listen(b, Topic::Changed(node(1)));
        bus.listen(b, Topic::Changed(node(1)));
        bus.emit(TreeEvent::Changed { node: node(1) });
        assert_eq!(bus.pending(a), 1);
        assert_eq!(bus.pending(b), 2);

        bus.release(b);
        assert_eq!(bus.pending(b), 0);
        assert_eq!(bus.listener_count_for(b), 0);
        assert_eq!(bus.listener_count(), 1);
    }
}
