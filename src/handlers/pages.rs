// Admin HTML pages. `/` and `/admin` are guarded by the edge gatekeeper.
use crate::gatekeeper::{ADMIN_PREFIX, LOGIN_PATH};
use actix_web::http::header;
use actix_web::HttpResponse;

/// `GET /` sends the browser to the admin area
pub async fn root() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, ADMIN_PREFIX))
        .finish()
}

/// `GET /admin/login`
pub async fn login_page() -> HttpResponse {
    html_page("管理者ログイン", &login_body())
}

/// `GET /admin`
pub async fn admin_home() -> HttpResponse {
    html_page("読み聞かせ管理", &admin_body())
}

fn html_page(title: &str, body: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(format!(
            r#"<!DOCTYPE html>
<html lang="ja">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{styles}</style>
</head>
<body>
    <main class="container">
{body}
    </main>
</body>
</html>"#,
            styles = page_styles(),
        ))
}

fn login_body() -> String {
    format!(
        r#"        <h1>管理者ログイン</h1>
        <form id="login-form">
            <label>ユーザー名 <input name="username" autocomplete="username" required></label>
            <label>パスワード <input name="password" type="password" autocomplete="current-password" required></label>
            <p id="error" class="error" hidden></p>
            <button type="submit">ログイン</button>
        </form>
        <script>
            document.getElementById('login-form').addEventListener('submit', async (event) => {{
                event.preventDefault();
                const form = new FormData(event.target);
                const response = await fetch('/api/auth/login', {{
                    method: 'POST',
                    headers: {{ 'Content-Type': 'application/json' }},
                    body: JSON.stringify({{ username: form.get('username'), password: form.get('password') }}),
                }});
                if (response.ok) {{
                    window.location.href = '{admin}';
                    return;
                }}
                const data = await response.json().catch(() => ({{}}));
                const error = document.getElementById('error');
                error.textContent = data.error || 'ログインに失敗しました';
                error.hidden = false;
            }});
        </script>"#,
        admin = ADMIN_PREFIX,
    )
}

fn admin_body() -> String {
    format!(
        r#"        <h1>読み聞かせ管理</h1>
        <ul>
            <li><a href="/api/school-years">年度一覧 (JSON)</a></li>
            <li><a href="/api/surveys">アンケート一覧 (JSON)</a></li>
        </ul>
        <button id="logout">ログアウト</button>
        <script>
            document.getElementById('logout').addEventListener('click', async () => {{
                await fetch('/api/auth/logout', {{ method: 'POST' }});
                window.location.href = '{login}';
            }});
        </script>"#,
        login = LOGIN_PATH,
    )
}

const fn page_styles() -> &'static str {
    r"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Hiragino Sans', 'Segoe UI', sans-serif;
            background-color: #f5f5f5;
            margin: 0;
        }
        .container {
            max-width: 420px;
            margin: 10vh auto;
            padding: 32px;
            background: #fff;
            border-radius: 8px;
        }
        label { display: block; margin-bottom: 16px; }
        input { width: 100%; padding: 8px; box-sizing: border-box; }
        button { padding: 8px 16px; }
        .error { color: #c62828; }
    "
}
