use super::parse_pic_id;
use crate::context::AppContext;
use anyhow::{Context, Result, bail};
use pixur_core::pic::{DeletionReason, Direction, NewPic, Pic, SoftDeleteRequest, UploadFile, VoteDirection};
use std::path::PathBuf;

pub async fn list(app: &AppContext, before: Option<String>, after: Option<String>) -> Result<()> {
    let page = match (before, after) {
        (Some(id), _) => app.pics.list_backward(parse_pic_id(&id)?).await?,
        (None, Some(id)) => app.pics.list_forward(Some(parse_pic_id(&id)?)).await?,
        (None, None) => app.pics.list_forward(None).await?,
    };

    if page.is_empty() {
        println!("No pictures.");
        return Ok(());
    }
    for pic in &page.pics {
        println!("{}", summary_line(app, pic));
    }
    if let Some(next) = page.continuation() {
        let flag = if page.direction == Direction::Forward {
            "--after"
        } else {
            "--before"
        };
        println!("\nMore: pixur list {} {}", flag, next);
    }
    Ok(())
}

pub async fn show(app: &AppContext, id: &str) -> Result<()> {
    let pic_id = parse_pic_id(id)?;
    let Some(open) = app.viewer().open(pic_id).await?.applied() else {
        bail!("Picture {} was not loaded", pic_id);
    };
    let pic = &open.details.pic;

    println!("{}", summary_line(app, pic));
    println!("  thumbnail: {}", app.absolute_url(&pic.thumbnail_relative_url));
    println!("  score:     {:.3} - {:.3}", pic.score_lo, pic.score_hi);
    if let Some(duration) = &pic.duration {
        println!("  duration:  {}", duration);
    }
    if pic.pending_deletion {
        println!("  pending deletion");
    }
    if !open.details.tags.is_empty() {
        let names: Vec<&str> = open.details.tags.iter().map(|tag| tag.name.as_str()).collect();
        println!("  tags:      {}", names.join(", "));
    }
    let comments: usize = open.comments.iter().map(|node| node.subtree_len()).sum();
    println!("  comments:  {}", comments);
    Ok(())
}

pub async fn upload(app: &AppContext, file: Option<PathBuf>, url: Option<String>) -> Result<()> {
    let file = match file {
        Some(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            Some(UploadFile { name, bytes })
        }
        None => None,
    };

    let pic = app.pics.create(&NewPic { file, url }).await?;
    println!("✅ Uploaded {}", summary_line(app, &pic));
    Ok(())
}

pub async fn vote(app: &AppContext, id: &str, vote: &str) -> Result<()> {
    let pic_id = parse_pic_id(id)?;
    let vote: VoteDirection = vote.parse()?;
    app.pics.vote(pic_id, vote).await?;
    println!("✅ Voted {} on {}", vote, pic_id);
    Ok(())
}

pub async fn delete(app: &AppContext, id: &str, details: Option<String>, rule_violation: bool) -> Result<()> {
    let pic_id = parse_pic_id(id)?;
    let reason = if rule_violation {
        DeletionReason::RuleViolation
    } else {
        DeletionReason::None
    };
    let mut request = SoftDeleteRequest::new(pic_id).with_reason(reason);
    request.details = details;

    app.pics.soft_delete(&request).await?;
    println!("✅ Marked {} for deletion", pic_id);
    Ok(())
}

fn summary_line(app: &AppContext, pic: &Pic) -> String {
    format!(
        "{}\t{}\t{}x{}\t{} views\t{}",
        pic.id,
        pic.mime,
        pic.width,
        pic.height,
        pic.view_count,
        app.absolute_url(&pic.relative_url)
    )
}
