//! In-process store used when no database is configured, and by the test suite.

use async_trait::async_trait;
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    models::{Blog, BlogChanges, BlogWithOwner, NewBlog, NewUser, Owner, User, UserWithBlogs},
    BlogStore, StoreError,
};

#[derive(Debug, Default)]
struct Collections {
    users: Vec<User>,
    blogs: Vec<Blog>,
}

impl Collections {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

/// Records live in insertion order behind one lock, so every write is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        let start = Instant::now();
        let _guard = self.inner.read().await;
        Ok(start.elapsed())
    }

    async fn list_blogs(&self) -> Result<Vec<BlogWithOwner>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .blogs
            .iter()
            .filter_map(|blog| {
                let user = inner.user(blog.user_id)?;
                Some(BlogWithOwner {
                    blog: blog.clone(),
                    owner: Owner {
                        id: user.id,
                        username: user.username.clone(),
                        name: user.name.clone(),
                    },
                })
            })
            .collect())
    }

    async fn find_blog(&self, id: Uuid) -> Result<Option<Blog>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.blogs.iter().find(|b| b.id == id).cloned())
    }

    async fn create_blog(&self, owner: Uuid, blog: NewBlog) -> Result<Blog, StoreError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == owner)
            .ok_or(StoreError::UnknownUser(owner))?;

        let created = Blog {
            id: Uuid::new_v4(),
            title: blog.title,
            author: blog.author,
            url: blog.url,
            likes: blog.likes,
            user_id: owner,
            created_at: Utc::now(),
        };
        user.blogs.push(created.id);
        inner.blogs.push(created.clone());

        Ok(created)
    }

    async fn update_blog(
        &self,
        id: Uuid,
        changes: BlogChanges,
    ) -> Result<Option<Blog>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.blogs.iter_mut().find(|b| b.id == id).map(|blog| {
            changes.apply_to(blog);
            blog.clone()
        }))
    }

    async fn delete_blog(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.blogs.len();
        inner.blogs.retain(|b| b.id != id);
        Ok(inner.blogs.len() < before)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::DuplicateUsername(user.username));
        }

        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            name: user.name,
            password_hash: user.password_hash,
            blogs: Vec::new(),
            created_at: Utc::now(),
        };
        inner.users.push(created.clone());

        Ok(created)
    }

    async fn list_users(&self) -> Result<Vec<UserWithBlogs>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .map(|user| UserWithBlogs {
                user: user.clone(),
                blogs: user
                    .blogs
                    .iter()
                    .filter_map(|id| inner.blogs.iter().find(|b| b.id == *id).cloned())
                    .collect(),
            })
            .collect())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            name: Some("Superuser".to_string()),
            password_hash: "not-a-real-hash".to_string(),
        }
    }

    fn new_blog(title: &str) -> NewBlog {
        NewBlog {
            title: title.to_string(),
            author: None,
            url: "http://example.com".to_string(),
            likes: 0,
        }
    }

    #[tokio::test]
    async fn test_create_blog_appends_to_owner() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("root")).await.unwrap();

        let first = store.create_blog(user.id, new_blog("first")).await.unwrap();
        let second = store.create_blog(user.id, new_blog("second")).await.unwrap();

        let stored = store.find_user_by_username("root").await.unwrap().unwrap();
        assert_eq!(stored.blogs, vec![first.id, second.id]);
        assert_eq!(first.user_id, user.id);
    }

    #[tokio::test]
    async fn test_create_blog_for_unknown_owner_writes_nothing() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();

        let result = store.create_blog(owner, new_blog("orphan")).await;

        assert!(matches!(result, Err(StoreError::UnknownUser(id)) if id == owner));
        assert!(store.list_blogs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        store.create_user(new_user("root")).await.unwrap();

        let result = store.create_user(new_user("root")).await;

        assert!(matches!(result, Err(StoreError::DuplicateUsername(name)) if name == "root"));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_blogs_embeds_owner() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("root")).await.unwrap();
        store.create_blog(user.id, new_blog("first")).await.unwrap();

        let blogs = store.list_blogs().await.unwrap();

        assert_eq!(blogs.len(), 1);
        assert_eq!(blogs[0].owner.username, "root");
        assert_eq!(blogs[0].owner.name.as_deref(), Some("Superuser"));
    }

    #[tokio::test]
    async fn test_delete_leaves_owner_reference_but_list_users_skips_it() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("root")).await.unwrap();
        let kept = store.create_blog(user.id, new_blog("kept")).await.unwrap();
        let gone = store.create_blog(user.id, new_blog("gone")).await.unwrap();

        assert!(store.delete_blog(gone.id).await.unwrap());
        assert!(!store.delete_blog(gone.id).await.unwrap());

        let stored = store.find_user_by_username("root").await.unwrap().unwrap();
        assert_eq!(stored.blogs.len(), 2);

        let users = store.list_users().await.unwrap();
        let ids: Vec<Uuid> = users[0].blogs.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![kept.id]);
    }

    #[tokio::test]
    async fn test_update_missing_blog_returns_none() {
        let store = MemoryStore::new();
        let updated = store
            .update_blog(Uuid::new_v4(), BlogChanges::default())
            .await
            .unwrap();
        assert!(updated.is_none());
    }
}
