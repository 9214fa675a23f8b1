//! Heuristic clicker and form-field helpers
//!
//! [`click`] snapshots the page with one script, ranks the snapshot with
//! [`crate::locator::rank_candidates`] and activates candidates in order until
//! one activation takes.

use anyhow::Result;
use serde_json::json;
use tracing::{debug, info};

use crate::errors::PipeprobeError;
use crate::locator::{self, Activation, Candidate, DomNode, Target};
use crate::webdriver::Browser;

/// Serializes the page into [`DomNode`]s and keeps the element array on
/// `window` so activations can refer to elements by index
pub const SNAPSHOT_SCRIPT: &str = r#"
    const MAX_NODES = 5000;
    if (!document.body) return [];
    const els = [document.body].concat(Array.from(document.body.querySelectorAll('*'))).slice(0, MAX_NODES);
    const pos = new Map(els.map((el, i) => [el, i]));
    window.__pipeprobeNodes = els;
    return els.map((el, i) => {
        const r = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        const cls = typeof el.className === 'string' ? el.className : (el.getAttribute('class') || '');
        return {
            index: i,
            parent: el.parentElement && pos.has(el.parentElement) ? pos.get(el.parentElement) : null,
            tag: el.tagName.toLowerCase(),
            text: (el.textContent || '').replace(/\s+/g, ' ').trim().slice(0, 200),
            className: cls,
            role: el.getAttribute('role'),
            hasOnclick: typeof el.onclick === 'function' || el.hasAttribute('onclick'),
            inputType: el.getAttribute('type'),
            inProviderBlock: !!el.closest('[data-provider="google"]'),
            inDialog: !!el.closest('.modal, .dialog, [role="dialog"], [aria-modal="true"]'),
            visible: r.width > 0 && r.height > 0 && style.visibility !== 'hidden' && style.display !== 'none',
            rect: { x: r.left, y: r.top, width: r.width, height: r.height }
        };
    });
"#;

const CLICK_NODE_SCRIPT: &str = r#"
    const el = (window.__pipeprobeNodes || [])[arguments[0]];
    if (!el || !el.isConnected) return false;
    el.scrollIntoView({ block: 'center' });
    el.click();
    return true;
"#;

const CLICK_POINT_SCRIPT: &str = r#"
    const x = arguments[0], y = arguments[1];
    const el = document.elementFromPoint(x, y);
    if (!el) return false;
    for (const type of ['mousedown', 'mouseup', 'click']) {
        el.dispatchEvent(new MouseEvent(type, { bubbles: true, cancelable: true, view: window, clientX: x, clientY: y }));
    }
    if (typeof el.focus === 'function') el.focus();
    return true;
"#;

const SET_VALUE_SCRIPT: &str = r#"
    const selectors = arguments[0], value = arguments[1];
    for (const sel of selectors) {
        const el = document.querySelector(sel);
        if (!el) continue;
        el.focus();
        const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
        const desc = Object.getOwnPropertyDescriptor(proto, 'value');
        if (desc && desc.set) { desc.set.call(el, value); } else { el.value = value; }
        el.dispatchEvent(new Event('input', { bubbles: true }));
        el.dispatchEvent(new Event('change', { bubbles: true }));
        return sel;
    }
    return null;
"#;

const LOGGED_IN_SCRIPT: &str = r#"
    const markers = 'nav, .sidebar, [role="navigation"], [data-test="workspace-nav"], .avatar, .user-menu, button[aria-label="User menu"]';
    if (document.querySelector(markers)) return true;
    const text = document.body ? document.body.innerText : '';
    return text.includes('Project') || text.includes('Workflow') || text.includes('Dashboard');
"#;

pub async fn snapshot(browser: &Browser) -> Result<Vec<DomNode>> {
    let nodes: Vec<DomNode> = browser.execute_as(SNAPSHOT_SCRIPT, vec![]).await?;
    debug!("Snapshot holds {} elements", nodes.len());
    Ok(nodes)
}

pub async fn activate(browser: &Browser, activation: &Activation) -> Result<bool> {
    let result = match *activation {
        Activation::Click { node } => browser.execute(CLICK_NODE_SCRIPT, vec![json!(node)]).await?,
        Activation::PointerAt { x, y } => click_point_raw(browser, x, y).await?,
    };
    Ok(result.as_bool().unwrap_or(false))
}

async fn click_point_raw(browser: &Browser, x: f64, y: f64) -> Result<serde_json::Value> {
    browser.execute(CLICK_POINT_SCRIPT, vec![json!(x), json!(y)]).await
}

/// Click the best candidate for `target`, falling through the ranking until an
/// activation succeeds
pub async fn click(browser: &Browser, target: &Target) -> Result<Candidate> {
    let nodes = snapshot(browser).await?;
    let candidates = locator::rank_candidates(&nodes, target);
    debug!("{} candidate(s) for '{}'", candidates.len(), target.label);

    for candidate in candidates {
        match activate(browser, &candidate.activation).await {
            Ok(true) => {
                info!(
                    "Clicked '{}' via {} ({})",
                    target.label, candidate.strategy, candidate.description
                );
                return Ok(candidate);
            }
            Ok(false) => debug!("Candidate vanished: {}", candidate.description),
            Err(e) => debug!("Activation failed for {}: {:#}", candidate.description, e),
        }
    }

    Err(PipeprobeError::ElementNotFound(target.label.clone()).into())
}

/// Click a visible text label, then click `offset_y` pixels below its bottom
/// centre to focus the field drawn there
pub async fn focus_below_label(browser: &Browser, label: &str, offset_y: f64) -> Result<()> {
    let nodes = snapshot(browser).await?;
    let anchor = locator::find_label(&nodes, label)
        .ok_or_else(|| PipeprobeError::ElementNotFound(format!("label '{label}'")))?;

    activate(browser, &Activation::Click { node: anchor.index }).await?;
    let (x, y) = (anchor.rect.center_x(), anchor.rect.bottom() + offset_y);
    if !activate(browser, &Activation::PointerAt { x, y }).await? {
        return Err(PipeprobeError::ElementNotFound(format!("field below '{label}'")).into());
    }
    debug!("Focused field below '{}' at ({}, {})", label, x, y);
    Ok(())
}

/// Click at viewport coordinates
pub async fn click_point(browser: &Browser, x: f64, y: f64) -> Result<bool> {
    Ok(click_point_raw(browser, x, y).await?.as_bool().unwrap_or(false))
}

/// Set a field's value through the first selector that matches, firing
/// `input` and `change`. Returns the selector used.
pub async fn set_field_value(
    browser: &Browser,
    selectors: &[&str],
    value: &str,
) -> Result<Option<String>> {
    let used = browser
        .execute(SET_VALUE_SCRIPT, vec![json!(selectors), json!(value)])
        .await?;
    Ok(used.as_str().map(str::to_string))
}

/// Whether the page shows UI that only exists after login
pub async fn is_logged_in(browser: &Browser) -> Result<bool> {
    let value = browser.execute(LOGGED_IN_SCRIPT, vec![]).await?;
    Ok(value.as_bool().unwrap_or(false))
}

#[cfg(test)]
#[path = "clicker_test.rs"]
mod clicker_test;
