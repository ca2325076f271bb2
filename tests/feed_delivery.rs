//! End-to-end delivery: follow graph, fanout, cached reads, gate cutover

use plume::{
    ContentId, Cursor, Environment, Plume, Settings, UserId, FEED_STORAGE_SWITCH,
    FOLLOW_STORAGE_SWITCH,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn small_stack() -> Plume {
    init_tracing();
    Plume::new(
        Environment::Testing,
        Settings {
            cache_capacity: 6,
            fanout_batch_size: 2,
            page_size: 3,
            ..Settings::default()
        },
    )
}

#[test]
fn post_reaches_author_immediately_and_followers_after_flush() {
    let app = small_stack();
    let author = UserId(1);
    for fan in [2, 3, 4] {
        assert!(app.follows.follow(UserId(fan), author).unwrap());
    }

    let receipt = app.post(author, ContentId(100)).unwrap();
    assert_eq!(receipt.follower_count, 3);
    assert_eq!(receipt.batch_count, 2);

    // the author's own entry is synchronous
    let own = app.feeds.page(author, Cursor::First).unwrap();
    assert_eq!(own.results.len(), 1);
    assert_eq!(own.results[0].content, ContentId(100));

    app.broadcaster.flush();
    for fan in [2, 3, 4] {
        let page = app.feeds.page(UserId(fan), Cursor::First).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].content, ContentId(100));
        assert_eq!(page.results[0].owner, UserId(fan));
    }
    app.shutdown();
}

#[test]
fn feed_pages_cover_history_beyond_cache_capacity() {
    let app = small_stack();
    let author = UserId(1);
    let reader = UserId(2);
    app.follows.follow(reader, author).unwrap();

    // 10 posts against cache capacity 6: the oldest four only exist on the
    // authoritative backend
    for content in 1..=10u64 {
        app.post(author, ContentId(content)).unwrap();
    }
    app.broadcaster.flush();

    let mut seen = Vec::new();
    let mut cursor = Cursor::First;
    loop {
        let page = app.feeds.page(reader, cursor).unwrap();
        seen.extend(page.results.iter().map(|entry| entry.content.as_u64()));
        if !page.has_next_page {
            break;
        }
        cursor = Cursor::OlderThan(page.results.last().unwrap().created_at);
    }
    assert_eq!(seen, vec![10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
    app.shutdown();
}

#[test]
fn refresh_pull_returns_only_posts_since_cursor() {
    let app = small_stack();
    let author = UserId(1);
    let reader = UserId(2);
    app.follows.follow(reader, author).unwrap();

    app.post(author, ContentId(1)).unwrap();
    app.broadcaster.flush();
    let top = app.feeds.page(reader, Cursor::First).unwrap().results[0].created_at;

    app.post(author, ContentId(2)).unwrap();
    app.post(author, ContentId(3)).unwrap();
    app.broadcaster.flush();

    let refreshed = app.feeds.page(reader, Cursor::NewerThan(top)).unwrap();
    let contents: Vec<u64> = refreshed
        .results
        .iter()
        .map(|entry| entry.content.as_u64())
        .collect();
    assert_eq!(contents, vec![3, 2]);
    assert!(!refreshed.has_next_page);
    app.shutdown();
}

#[test]
fn unfollowed_user_stops_receiving_posts() {
    let app = small_stack();
    let author = UserId(1);
    let fan = UserId(2);
    app.follows.follow(fan, author).unwrap();

    app.post(author, ContentId(1)).unwrap();
    app.broadcaster.flush();
    assert!(app.follows.unfollow(fan, author).unwrap());

    app.post(author, ContentId(2)).unwrap();
    app.broadcaster.flush();

    let page = app.feeds.page(fan, Cursor::First).unwrap();
    let contents: Vec<u64> = page
        .results
        .iter()
        .map(|entry| entry.content.as_u64())
        .collect();
    // the old delivery stays, the new post never arrives
    assert_eq!(contents, vec![1]);
    app.shutdown();
}

#[test]
fn gate_cutover_moves_new_users_to_the_column_store() {
    let app = small_stack();

    // a user whose data lands on the relational backend
    let before = UserId(1);
    app.follows.follow(UserId(5), before).unwrap();
    app.post(before, ContentId(1)).unwrap();
    app.broadcaster.flush();

    app.gate.set_percent(FOLLOW_STORAGE_SWITCH, 100);
    app.gate.set_percent(FEED_STORAGE_SWITCH, 100);
    assert!(app.gate.is_fully_open(FEED_STORAGE_SWITCH));

    // post-cutover traffic flows through the column store
    let after = UserId(2);
    app.follows.follow(UserId(6), after).unwrap();
    app.post(after, ContentId(2)).unwrap();
    app.broadcaster.flush();

    assert_eq!(app.follows.follower_ids(after).unwrap(), vec![UserId(6)]);
    let page = app.feeds.page(UserId(6), Cursor::First).unwrap();
    assert_eq!(page.results[0].content, ContentId(2));
    app.shutdown();
}

#[test]
fn fanout_to_a_large_following_is_complete_and_duplicate_free() {
    let app = small_stack();
    let author = UserId(1);
    for fan in 2..=41u64 {
        app.follows.follow(UserId(fan), author).unwrap();
    }

    let receipt = app.post(author, ContentId(7)).unwrap();
    assert_eq!(receipt.follower_count, 40);
    assert_eq!(receipt.batch_count, 20);
    app.broadcaster.flush();

    for fan in 2..=41u64 {
        let page = app.feeds.page(UserId(fan), Cursor::First).unwrap();
        assert_eq!(page.results.len(), 1, "fan {} got a wrong delivery count", fan);
    }
    app.shutdown();
}
