use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::API_V1_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn enc(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

fn v1(base: &str, path: &str) -> String {
    base_join(base, &format!("{}/{}", API_V1_PREFIX, path))
}

fn child_scoped(base: &str, child_id: &str, suffix: &str) -> String {
    v1(base, &format!("children/{}/{}", enc(child_id), suffix))
}

pub fn auth_register(base: &str) -> String {
    v1(base, "auth/register")
}
pub fn auth_login(base: &str) -> String {
    v1(base, "auth/login")
}
pub fn auth_logout(base: &str) -> String {
    v1(base, "auth/logout")
}
pub fn auth_session(base: &str) -> String {
    v1(base, "auth/session")
}
pub fn catalog(base: &str) -> String {
    v1(base, "catalog")
}
pub fn dashboard(base: &str) -> String {
    v1(base, "dashboard")
}
pub fn settings(base: &str) -> String {
    v1(base, "settings")
}
pub fn events(base: &str) -> String {
    v1(base, "events")
}

pub fn children(base: &str) -> String {
    v1(base, "children")
}
pub fn child(base: &str, child_id: &str) -> String {
    v1(base, &format!("children/{}", enc(child_id)))
}
pub fn child_play(base: &str, child_id: &str) -> String {
    child_scoped(base, child_id, "play")
}
pub fn child_rewards(base: &str, child_id: &str) -> String {
    child_scoped(base, child_id, "rewards")
}
pub fn child_reset_progress(base: &str, child_id: &str) -> String {
    child_scoped(base, child_id, "reset-progress")
}
pub fn child_reset_rewards(base: &str, child_id: &str) -> String {
    child_scoped(base, child_id, "reset-rewards")
}
pub fn child_today_completions(base: &str, child_id: &str) -> String {
    child_scoped(base, child_id, "completions/today")
}
pub fn child_weekly_stats(base: &str, child_id: &str) -> String {
    child_scoped(base, child_id, "stats/weekly")
}
pub fn child_complete_task(base: &str, child_id: &str, task_id: &str) -> String {
    child_scoped(base, child_id, &format!("tasks/{}/complete", enc(task_id)))
}

pub fn tasks(base: &str) -> String {
    v1(base, "tasks")
}
pub fn task(base: &str, task_id: &str) -> String {
    v1(base, &format!("tasks/{}", enc(task_id)))
}
pub fn task_templates(base: &str) -> String {
    v1(base, "tasks/templates")
}
pub fn task_from_template(base: &str, index: usize) -> String {
    v1(base, &format!("tasks/templates/{}", index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_double_slashes() {
        assert_eq!(
            children("http://localhost:5151/"),
            "http://localhost:5151/api/v1/children"
        );
    }

    #[test]
    fn encodes_path_segments() {
        assert_eq!(
            child_complete_task("http://h", "a b", "t/1"),
            "http://h/api/v1/children/a%20b/tasks/t%2F1/complete"
        );
    }
}
