//! Cosmetic text: heartbeat flavor lines, loading animations, presence
//! activities.
//!
//! Everything here takes an explicit [`Rng`] so tests can seed it.

use rand::Rng;
use rand::seq::SliceRandom;

use super::PresenceStatus;

/// Names available to the heartbeat for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeContext {
    /// Display name of the user who asked.
    pub author: String,
    /// Display name of the relay itself.
    pub bot: String,
    /// Other members of the channel. Falls back to the author when empty.
    pub members: Vec<String>,
}

impl NoticeContext {
    pub fn new(author: impl Into<String>, bot: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            author: author.into(),
            bot: bot.into(),
            members,
        }
    }

    fn member<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.members
            .choose(rng)
            .map(String::as_str)
            .unwrap_or(&self.author)
    }
}

/// Number of distinct flavor lines.
pub const FLAVOR_LINES: usize = 9;

/// Pick a random flavor line for a heartbeat notice.
pub fn flavor_line<R: Rng + ?Sized>(ctx: &NoticeContext, rng: &mut R) -> String {
    flavor_line_at(ctx, rng.gen_range(0..FLAVOR_LINES), rng)
}

/// Flavor line number `index` (mod [`FLAVOR_LINES`]), with random members.
pub fn flavor_line_at<R: Rng + ?Sized>(ctx: &NoticeContext, index: usize, rng: &mut R) -> String {
    let author = &ctx.author;
    match index % FLAVOR_LINES {
        0 => format!("***{author}** is stinky*"),
        1 => format!("***{author}** thinks **{}** is stinky*", ctx.member(rng)),
        2 => format!("***{author}** thinks **{}** smells nice*", ctx.member(rng)),
        3 => format!("***{author}** likes to eat **{}**'s toes*", ctx.member(rng)),
        4 => format!("***{}** is the best bot to ever exist 😎*", ctx.bot),
        5 => "*1, 2, 3, 4... what comes after 4 again?*".to_string(),
        6 => "*All your memes are belong to us*".to_string(),
        7 => format!("***{author}** has a crush on **{}***", ctx.member(rng)),
        _ => format!("***{}** likes to smell **{author}**'s shirts*", ctx.member(rng)),
    }
}

/// Footer line of every heartbeat notice.
pub fn notice_footer(elapsed: &str) -> String {
    format!("[{elapsed}] Brought to you by **Spicy Text Pty Ltd**")
}

/// Sent alongside the flavor notice once the interval has hit its cap.
pub const STILL_PROCESSING: &str =
    "*Please wait, the response is still processing ()... :woozy_face: *";

/// Animations shown while the backend works.
pub const LOADING_ANIMATIONS: &[&str] = &[
    "https://c.tenor.com/zP2FVpaCZMkAAAAd/tenor.gif",
    "https://c.tenor.com/zAJgVsraM6UAAAAd/tenor.gif",
    "https://c.tenor.com/qU7kKSP7JgsAAAAC/tenor.gif",
    "https://media3.giphy.com/media/v1.Y2lkPTc5MGI3NjExZWJzc2k4ODJsazM5bTd3dGNqdjk3OXJ5OGlqeG9oamlsZjhqZmUyayZlcD12MV9pbnRlcm5hbF9naWZfYnlfaWQmY3Q9Zw/ihVjxokZuNswo/giphy.gif",
    "https://media0.giphy.com/media/v1.Y2lkPTc5MGI3NjExOTd3NHByYjRkZDMybXZzaDU1bDF1Njk3anNsdWE5cHVpNWtieWNrNCZlcD12MV9pbnRlcm5hbF9naWZfYnlfaWQmY3Q9Zw/l46Ck4CGc762ion28/giphy.gif",
    "https://c.tenor.com/KEzW7ALwfUAAAAAC/tenor.gif",
];

pub fn loading_animation<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    LOADING_ANIMATIONS
        .choose(rng)
        .copied()
        .unwrap_or(LOADING_ANIMATIONS[0])
}

const AVAILABLE_ACTIVITIES: &[&str] = &[
    "💣 Armed and primed 💣",
    "💣 Lock n loaded 💣",
    "💣 It's time to kick gum and chew ass 💣",
];

const BUSY_ACTIVITIES: &[&str] = &[
    "🐓 Streaming your data back to China 🐓",
    "🐓 Choking the AI chicken 🐓",
    "🐓 Sending data to your mom 🐓",
];

/// Random activity line for a presence status.
pub fn presence_activity<R: Rng + ?Sized>(status: PresenceStatus, rng: &mut R) -> &'static str {
    let pool = match status {
        PresenceStatus::Available => AVAILABLE_ACTIVITIES,
        PresenceStatus::Busy => BUSY_ACTIVITIES,
    };
    pool.choose(rng).copied().unwrap_or(pool[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ctx(members: &[&str]) -> NoticeContext {
        NoticeContext::new(
            "ada",
            "thonk",
            members.iter().map(|m| m.to_string()).collect(),
        )
    }

    #[test]
    fn every_line_renders_and_mentions_someone_or_something() {
        let mut rng = StdRng::seed_from_u64(7);
        let ctx = ctx(&["grace"]);
        for i in 0..FLAVOR_LINES {
            let line = flavor_line_at(&ctx, i, &mut rng);
            assert!(line.starts_with('*') && line.ends_with('*'), "{line}");
        }
        assert!(flavor_line_at(&ctx, 1, &mut rng).contains("**grace**"));
        assert!(flavor_line_at(&ctx, 4, &mut rng).contains("**thonk**"));
    }

    #[test]
    fn empty_member_list_falls_back_to_author() {
        let mut rng = StdRng::seed_from_u64(1);
        let line = flavor_line_at(&ctx(&[]), 7, &mut rng);
        assert_eq!(line, "***ada** has a crush on **ada***");
    }

    #[test]
    fn footer_carries_elapsed_tag() {
        assert_eq!(
            notice_footer("0:00:45"),
            "[0:00:45] Brought to you by **Spicy Text Pty Ltd**"
        );
    }

    #[test]
    fn activities_come_from_the_right_pool() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            assert!(presence_activity(PresenceStatus::Busy, &mut rng).starts_with('🐓'));
            assert!(presence_activity(PresenceStatus::Available, &mut rng).starts_with('💣'));
        }
        assert!(LOADING_ANIMATIONS.contains(&loading_animation(&mut rng)));
    }
}
