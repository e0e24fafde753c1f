//! # upnest-feed
//!
//! Demo binary that wires the interaction engine together and walks a
//! scripted classroom session against the configured transport: the
//! in-memory mock by default, or the real backend with mock failover when
//! `api.use_mock` is off.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use configs::Settings;
use domains::{ChatApi, InteractionApi, Page, ReactionType, Role};
use services::{ChatService, InteractionStore, PermissionChecker};
use transport_adapters::{MemoryTransport, SeedData};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let settings = Settings::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    // 2. Transport selection
    let (memory, seed) = MemoryTransport::seeded();
    let (interactions, chat): (Arc<dyn InteractionApi>, Arc<dyn ChatApi>) =
        if settings.api.use_mock {
            info!("running against the in-memory transport");
            let memory = Arc::new(memory);
            (memory.clone(), memory)
        } else {
            build_rest(&settings, memory)?
        };

    run_session(interactions, chat, seed).await
}

#[cfg(feature = "http-rest")]
fn build_rest(
    settings: &Settings,
    fallback: MemoryTransport,
) -> Result<(Arc<dyn InteractionApi>, Arc<dyn ChatApi>)> {
    use std::time::Duration;
    use transport_adapters::{Failover, MemoryTokenStore, RestTransport};

    let tokens = Arc::new(match &settings.api.access_token {
        Some(token) => MemoryTokenStore::with_token(token.clone()),
        None => MemoryTokenStore::new(),
    });
    let rest = RestTransport::new(
        &settings.api.base_url,
        Duration::from_millis(settings.api.timeout_ms),
        tokens,
    )?;
    info!(base_url = %settings.api.base_url, "running against the REST backend with mock failover");
    let transport = Arc::new(Failover::new(rest, fallback));
    Ok((transport.clone(), transport))
}

#[cfg(not(feature = "http-rest"))]
fn build_rest(
    _settings: &Settings,
    fallback: MemoryTransport,
) -> Result<(Arc<dyn InteractionApi>, Arc<dyn ChatApi>)> {
    warn!("built without `http-rest`; using the in-memory transport");
    let memory = Arc::new(fallback);
    Ok((memory.clone(), memory))
}

async fn run_session(
    interactions: Arc<dyn InteractionApi>,
    chat: Arc<dyn ChatApi>,
    seed: SeedData,
) -> Result<()> {
    let teacher = InteractionStore::new(
        PermissionChecker::new(Role::Teacher, Some(seed.teacher_id)),
        interactions.clone(),
    );
    let student = InteractionStore::new(
        PermissionChecker::new(Role::Student, Some(seed.student_id)),
        interactions,
    );

    // 3. The student browses the feed and reacts
    let feed = student.load_feed(seed.group_id).await?;
    info!(posts = feed.len(), "student loaded the group feed");

    let post = student
        .toggle_reaction(seed.teacher_post_id, ReactionType::Like)
        .await?;
    info!(total = post.total_reactions(), "student liked the reading post");

    let comment = student
        .add_comment(seed.teacher_post_id, "Will this be on the quiz?".into(), vec![])
        .await?;
    info!(status = ?comment.status, "student commented (queued for review)");

    // 4. The teacher works through the moderation queue
    teacher.load_feed(seed.group_id).await?;
    let queue = teacher.pending_comments(seed.group_id).await?;
    info!(pending = queue.len(), "teacher opened the moderation queue");
    for pending in queue {
        let approved = teacher.approve_comment(pending.post_id, pending.id).await?;
        info!(comment = %approved.id, "comment approved");
    }
    teacher.approve_post(seed.pending_post_id).await?;

    // 5. The teacher locks the thread; the student bounces off the lock
    teacher
        .set_comments_locked(seed.teacher_post_id, true)
        .await?;
    student.load_post(seed.teacher_post_id).await?;
    match student
        .add_comment(seed.teacher_post_id, "One more thing...".into(), vec![])
        .await
    {
        Err(err) => info!(%err, "comment lock held, as expected"),
        Ok(_) => warn!("comment lock did not hold"),
    }

    // 6. Classroom chat
    let chat = ChatService::new(chat);
    let conversations = chat.conversations().await?;
    info!(count = conversations.len(), "conversations loaded");
    chat.send(
        seed.conversation_id,
        seed.teacher_id,
        "Reminder: questions under the reading post, please.".into(),
    )
    .await?;
    let history = chat.messages(seed.conversation_id, Page::default()).await?;
    info!(messages = history.len(), "conversation history loaded");

    Ok(())
}
