use super::{find_user, open_store};
use crate::config::Config;
use crate::db::SequenceQuery;

pub async fn cmd_sequences(config: &Config, email: &str, limit: u64) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let user = find_user(&store, email).await?;

    let sequences = store
        .list_user_sequences(
            user.id,
            &SequenceQuery {
                limit: Some(limit),
                ..SequenceQuery::default()
            },
        )
        .await?;

    if sequences.is_empty() {
        println!("No sequences uploaded by {}.", user.username);
        return Ok(());
    }

    println!("{:<6} {:<36} {:<18} Created", "ID", "Name", "Status");
    println!("{:-<80}", "");
    for sequence in sequences {
        let length = sequence
            .metadata
            .get("length")
            .and_then(serde_json::Value::as_u64)
            .map_or_else(|| "?".to_string(), |l| format!("{l} bp"));
        println!(
            "{:<6} {:<36} {:<18} {} ({length})",
            sequence.id.value(),
            truncate(&sequence.name, 36),
            sequence.status.to_string(),
            sequence.created_at,
        );
    }

    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("chr1", 36), "chr1");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
