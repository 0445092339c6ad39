//! Client-side state that absorbs REST snapshots and socket events.
//!
//! The same record can arrive twice: once as the REST response to an
//! optimistic action and once as the socket echo. Every collection here is
//! keyed by record id so the second arrival is a no-op.

use crate::models::{Message, Notification, PostView};
use crate::websocket::ServerEvent;
use uuid::Uuid;

pub trait Keyed {
    fn key(&self) -> Uuid;
}

impl Keyed for Message {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for Notification {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for PostView {
    fn key(&self) -> Uuid {
        self.id
    }
}

/// Ordered list with unique keys
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    items: Vec<T>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: Uuid) -> bool {
        self.items.iter().any(|item| item.key() == key)
    }

    pub fn get(&self, key: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.key() == key)
    }

    /// Append unless the key is already present. Returns whether it was added.
    pub fn insert(&mut self, item: T) -> bool {
        if self.contains(item.key()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Like [`Timeline::insert`] but at the front.
    pub fn prepend(&mut self, item: T) -> bool {
        if self.contains(item.key()) {
            return false;
        }
        self.items.insert(0, item);
        true
    }

    pub fn remove(&mut self, key: Uuid) -> Option<T> {
        let index = self.items.iter().position(|item| item.key() == key)?;
        Some(self.items.remove(index))
    }

    /// Apply `f` to the item with `key`. Returns false when absent.
    pub fn patch(&mut self, key: Uuid, f: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|item| item.key() == key) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    /// Replace everything with `snapshot`, keeping the first of any duplicate keys.
    pub fn replace_all(&mut self, snapshot: Vec<T>) {
        self.items.clear();
        for item in snapshot {
            self.insert(item);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

/// Direct-message thread between `me` and one counterpart, oldest first.
#[derive(Debug, Clone)]
pub struct ChatThread {
    me: Uuid,
    counterpart: Uuid,
    messages: Timeline<Message>,
}

impl ChatThread {
    pub fn new(me: Uuid, counterpart: Uuid) -> Self {
        Self {
            me,
            counterpart,
            messages: Timeline::new(),
        }
    }

    pub fn belongs(&self, message: &Message) -> bool {
        message.counterpart(self.me) == Some(self.counterpart)
    }

    pub fn load(&mut self, snapshot: Vec<Message>) {
        let snapshot = snapshot.into_iter().filter(|m| self.belongs(m)).collect();
        self.messages.replace_all(snapshot);
    }

    /// Record a message, either the REST result of a send or a socket echo.
    pub fn accept(&mut self, message: Message) -> bool {
        self.belongs(&message) && self.messages.insert(message)
    }

    /// Returns whether local state changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::NewMessage(view) => self.accept(view.message.clone()),
            ServerEvent::MessageRead(read) => self
                .messages
                .patch(read.message_id, |m| m.is_read = read.is_read),
            _ => false,
        }
    }

    pub fn messages(&self) -> &Timeline<Message> {
        &self.messages
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationInbox {
    items: Timeline<Notification>,
    unread: u64,
}

impl NotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, snapshot: Vec<Notification>, unread: u64) {
        self.items.replace_all(snapshot);
        self.unread = unread;
    }

    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::NewNotification(view) => {
                let unread = !view.notification.is_read;
                let added = self.items.prepend(view.notification.clone());
                if added && unread {
                    self.unread += 1;
                }
                added
            }
            _ => false,
        }
    }

    pub fn mark_read(&mut self, id: Uuid) -> bool {
        let mut was_unread = false;
        self.items.patch(id, |n| {
            was_unread = !n.is_read;
            n.is_read = true;
        });
        if was_unread {
            self.unread = self.unread.saturating_sub(1);
        }
        was_unread
    }

    pub fn mark_all_read(&mut self) {
        for notification in self.items.iter_mut() {
            notification.is_read = true;
        }
        self.unread = 0;
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Notification> {
        let removed = self.items.remove(id)?;
        if !removed.is_read {
            self.unread = self.unread.saturating_sub(1);
        }
        Some(removed)
    }

    pub fn unread(&self) -> u64 {
        self.unread
    }

    pub fn items(&self) -> &Timeline<Notification> {
        &self.items
    }
}

/// Post feed, newest first.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    posts: Timeline<PostView>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, snapshot: Vec<PostView>) {
        self.posts.replace_all(snapshot);
    }

    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::NewPost(post) => self.posts.prepend(post.as_ref().clone()),
            ServerEvent::DeletePost(deleted) => self.posts.remove(deleted.post_id).is_some(),
            ServerEvent::PostInterest(interest) => self.posts.patch(interest.post_id, |post| {
                post.interested_count = interest.interested_count;
                if !post.interested_users.contains(&interest.interested_by.id) {
                    post.interested_users.push(interest.interested_by.id);
                }
            }),
            _ => false,
        }
    }

    pub fn posts(&self) -> &Timeline<PostView> {
        &self.posts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationType;
    use crate::models::post::{PlantAnalysis, PostType, WeatherSnapshot};
    use crate::models::{Location, UserSummary};
    use crate::websocket::events::{
        DeletePostPayload, InterestedBy, MessageReadPayload, PostInterestPayload,
    };
    use chrono::Utc;

    fn message(from: Uuid, to: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: from,
            recipient_id: to,
            content: "is the monstera still available?".into(),
            post_id: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    fn summary() -> UserSummary {
        UserSummary {
            id: Uuid::new_v4(),
            name: "Meera".into(),
            avatar: None,
            location: None,
        }
    }

    fn notification(is_read: bool) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient: Uuid::new_v4(),
            sender: summary(),
            kind: NotificationType::NewMessage,
            title: "New message 💬".into(),
            body: "Meera: hi".into(),
            post_id: None,
            message_id: None,
            post: None,
            is_read,
            created_at: Utc::now(),
        }
    }

    fn post() -> PostView {
        let id = Uuid::new_v4();
        PostView {
            id,
            legacy_id: id,
            user: summary(),
            post_type: PostType::Available,
            title: "Pothos cutting".into(),
            description: String::new(),
            image_url: None,
            ai_analysis: PlantAnalysis::default(),
            weather_snapshot: WeatherSnapshot::default(),
            location: Location::default(),
            interested_users: Vec::new(),
            interested_count: 0,
            is_active: true,
            is_swapped: false,
            swapped_at: None,
            swapped_with: None,
            tags: Vec::new(),
            is_new: true,
            distance: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_timeline_insert_is_idempotent() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = message(a, b);
        let mut timeline = Timeline::new();

        assert!(timeline.insert(msg.clone()));
        assert!(!timeline.insert(msg.clone()));
        assert_eq!(timeline.len(), 1);

        assert!(timeline.patch(msg.id, |m| m.is_read = true));
        assert!(timeline.get(msg.id).unwrap().is_read);
        assert!(!timeline.patch(Uuid::new_v4(), |m| m.is_read = false));

        assert!(timeline.remove(msg.id).is_some());
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_replace_all_drops_duplicate_keys() {
        let msg = message(Uuid::new_v4(), Uuid::new_v4());
        let mut timeline = Timeline::new();
        timeline.replace_all(vec![msg.clone(), msg.clone()]);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_rest_result_then_socket_echo_yields_one_message() {
        let (me, them) = (Uuid::new_v4(), Uuid::new_v4());
        let mut thread = ChatThread::new(me, them);
        let sent = message(me, them);

        assert!(thread.accept(sent.clone()));
        assert!(!thread.apply(&ServerEvent::NewMessage(sent.into())));
        assert_eq!(thread.messages().len(), 1);

        // reply from the counterpart lands after it
        let reply = message(them, me);
        assert!(thread.apply(&ServerEvent::NewMessage(reply.clone().into())));
        assert_eq!(thread.messages().as_slice()[1].id, reply.id);
    }

    #[test]
    fn test_thread_ignores_other_conversations() {
        let (me, them, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut thread = ChatThread::new(me, them);

        assert!(!thread.apply(&ServerEvent::NewMessage(message(stranger, me).into())));
        thread.load(vec![message(me, them), message(stranger, me)]);
        assert_eq!(thread.messages().len(), 1);
    }

    #[test]
    fn test_thread_applies_message_read() {
        let (me, them) = (Uuid::new_v4(), Uuid::new_v4());
        let mut thread = ChatThread::new(me, them);
        let sent = message(me, them);
        thread.accept(sent.clone());

        assert!(thread.apply(&ServerEvent::MessageRead(MessageReadPayload {
            message_id: sent.id,
            is_read: true,
        })));
        assert!(thread.messages().get(sent.id).unwrap().is_read);
    }

    #[test]
    fn test_inbox_counts_unread() {
        let mut inbox = NotificationInbox::new();
        let first = notification(false);
        inbox.load(vec![notification(true)], 0);

        let event = ServerEvent::NewNotification(Box::new(first.clone().into()));
        assert!(inbox.apply(&event));
        assert!(!inbox.apply(&event));
        assert_eq!(inbox.unread(), 1);
        assert_eq!(inbox.items().as_slice()[0].id, first.id);

        assert!(inbox.mark_read(first.id));
        assert!(!inbox.mark_read(first.id));
        assert_eq!(inbox.unread(), 0);
    }

    #[test]
    fn test_inbox_remove_and_mark_all() {
        let mut inbox = NotificationInbox::new();
        let unread = notification(false);
        let read = notification(true);
        inbox.load(vec![unread.clone(), read.clone()], 1);

        inbox.remove(read.id);
        assert_eq!(inbox.unread(), 1);
        inbox.remove(unread.id);
        assert_eq!(inbox.unread(), 0);

        inbox.load(vec![notification(false), notification(false)], 2);
        inbox.mark_all_read();
        assert_eq!(inbox.unread(), 0);
        assert!(inbox.items().iter().all(|n| n.is_read));
    }

    #[test]
    fn test_feed_events() {
        let mut feed = FeedState::new();
        let older = post();
        feed.load(vec![older.clone()]);

        let newer = post();
        assert!(feed.apply(&ServerEvent::NewPost(Box::new(newer.clone()))));
        assert!(!feed.apply(&ServerEvent::NewPost(Box::new(newer.clone()))));
        assert_eq!(feed.posts().as_slice()[0].id, newer.id);

        let fan = Uuid::new_v4();
        assert!(feed.apply(&ServerEvent::PostInterest(PostInterestPayload {
            post_id: older.id,
            interested_count: 1,
            interested_by: InterestedBy {
                id: fan,
                name: "Kabir".into(),
            },
        })));
        let updated = feed.posts().get(older.id).unwrap();
        assert_eq!(updated.interested_count, 1);
        assert_eq!(updated.interested_users, vec![fan]);

        assert!(feed.apply(&ServerEvent::DeletePost(DeletePostPayload { post_id: newer.id })));
        assert_eq!(feed.posts().len(), 1);
    }
}
