mod common;

use chrono::Duration;
use common::{harness, profile, t0};
use time_engine::contract::model::{LeaderboardQuery, Timeframe};

#[tokio::test]
async fn ranks_survive_search_filtering() {
    let h = harness();
    let mut names = Vec::new();
    for (name, xp) in [("Alice", 300), ("bob", 900), ("Alina", 100), ("carl", 500)] {
        let mut p = profile(10, xp, Some(t0()));
        p.username = name.into();
        names.push(p.id);
        h.store.inner.put_profile(p);
    }

    let all = h.service.leaderboard(&LeaderboardQuery::default()).await;
    let order: Vec<_> = all.iter().map(|r| (r.rank, r.username.as_str())).collect();
    assert_eq!(order, vec![(1, "bob"), (2, "carl"), (3, "Alice"), (4, "Alina")]);

    let filtered = h
        .service
        .leaderboard(&LeaderboardQuery {
            timeframe: Timeframe::AllTime,
            search: Some("ALI".into()),
        })
        .await;
    let order: Vec<_> = filtered.iter().map(|r| (r.rank, r.username.as_str())).collect();
    assert_eq!(order, vec![(3, "Alice"), (4, "Alina")]);
}

#[tokio::test]
async fn timeframe_limits_by_activity() {
    let h = harness();
    let mut fresh = profile(10, 10, Some(t0() - Duration::hours(2)));
    fresh.username = "fresh".into();
    let mut weekly = profile(10, 50, Some(t0() - Duration::days(3)));
    weekly.username = "weekly".into();
    let mut stale = profile(10, 90, Some(t0() - Duration::days(30)));
    stale.username = "stale".into();
    for p in [fresh, weekly, stale] {
        h.store.inner.put_profile(p);
    }

    let query = |timeframe| LeaderboardQuery {
        timeframe,
        search: None,
    };
    assert_eq!(h.service.leaderboard(&query(Timeframe::Daily)).await.len(), 1);
    assert_eq!(h.service.leaderboard(&query(Timeframe::Weekly)).await.len(), 2);
    assert_eq!(h.service.leaderboard(&query(Timeframe::AllTime)).await.len(), 3);
}

#[tokio::test]
async fn ties_keep_store_order_and_current_rank_counts_strictly_higher() {
    let h = harness();
    let mut ids = Vec::new();
    for xp in [200, 200, 700] {
        let p = profile(10, xp, Some(t0()));
        ids.push(p.id);
        h.store.inner.put_profile(p);
    }

    assert_eq!(h.service.current_rank(ids[2]).await.unwrap(), 1);
    assert_eq!(h.service.current_rank(ids[0]).await.unwrap(), 2);
    assert_eq!(h.service.current_rank(ids[1]).await.unwrap(), 2);

    let board = h.service.leaderboard(&LeaderboardQuery::default()).await;
    let ranks: Vec<u32> = board.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}
