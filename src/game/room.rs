//! The room the local user is currently in.

use crate::core::buffer::Id;
use crate::game::avatar::Avatar;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub id: Id,
    pub model: String,
    avatars: HashMap<i32, Avatar>,
}

impl Room {
    pub fn new(id: Id, model: impl Into<String>) -> Self {
        Self {
            id,
            model: model.into(),
            avatars: HashMap::new(),
        }
    }

    pub fn get_by_index(&self, index: i32) -> Option<&Avatar> {
        self.avatars.get(&index)
    }

    pub fn get_by_id(&self, id: Id) -> Option<&Avatar> {
        self.avatars.values().find(|a| a.id == id)
    }

    /// Like [`Room::get_by_id`] but only matches users. Pets and bots have
    /// their own id space.
    pub fn get_user_by_id(&self, id: Id) -> Option<&Avatar> {
        self.avatars.values().find(|a| a.id == id && a.is_user())
    }

    /// Case-insensitive lookup.
    pub fn get_by_name(&self, name: &str) -> Option<&Avatar> {
        self.avatars
            .values()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn get_mut(&mut self, index: i32) -> Option<&mut Avatar> {
        self.avatars.get_mut(&index)
    }

    /// Insert `avatar`, returning whatever occupied its index before.
    pub(crate) fn insert(&mut self, avatar: Avatar) -> Option<Avatar> {
        self.avatars.insert(avatar.index, avatar)
    }

    pub(crate) fn remove(&mut self, index: i32) -> Option<Avatar> {
        self.avatars.remove(&index)
    }

    pub fn avatars(&self) -> impl Iterator<Item = &Avatar> {
        self.avatars.values()
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::game::avatar::{AvatarKind, Gender, Posture, Tile};

    fn avatar(id: i64, index: i32, name: &str) -> Avatar {
        Avatar {
            id: Id(id),
            index,
            name: name.to_string(),
            motto: String::new(),
            figure: String::new(),
            kind: AvatarKind::User {
                gender: Gender::Male,
                achievement_score: 0,
            },
            location: Tile::default(),
            direction: 0,
            head_direction: 0,
            posture: Posture::Stand,
            moving_to: None,
            sign: None,
            dance: 0,
            effect: 0,
            action: 0,
            is_typing: false,
        }
    }

    #[test]
    fn test_lookups() {
        let mut room = Room::new(Id(1), "model_a");
        room.insert(avatar(7, 0, "Alice"));
        room.insert(avatar(9, 3, "Bob"));

        assert_eq!(room.get_by_index(3).unwrap().name, "Bob");
        assert_eq!(room.get_by_id(Id(7)).unwrap().index, 0);
        assert_eq!(room.get_by_name("alice").unwrap().id, Id(7));
        assert!(room.get_by_id(Id(8)).is_none());
    }

    #[test]
    fn test_user_lookup_skips_pets_and_bots() {
        let mut room = Room::new(Id(1), "model_a");
        let mut pet = avatar(42, 3, "Rex");
        pet.kind = AvatarKind::Pet {
            owner_id: Id(7),
            owner_name: "Alice".to_string(),
        };
        room.insert(pet);

        assert_eq!(room.get_by_id(Id(42)).unwrap().name, "Rex");
        assert!(room.get_user_by_id(Id(42)).is_none());

        room.insert(avatar(42, 5, "Dave"));
        assert_eq!(room.get_user_by_id(Id(42)).unwrap().index, 5);
    }

    #[test]
    fn test_insert_returns_previous_occupant() {
        let mut room = Room::new(Id(1), "model_a");
        assert!(room.insert(avatar(7, 0, "Alice")).is_none());
        let previous = room.insert(avatar(8, 0, "Carol")).unwrap();
        assert_eq!(previous.id, Id(7));
        assert_eq!(room.len(), 1);
        assert_eq!(room.remove(0).unwrap().id, Id(8));
        assert!(room.is_empty());
    }
}
