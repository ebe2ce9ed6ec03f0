pub fn render_verification_code(code: &str) -> String {
    format!("<p>Your Gym Hub verification code is <b>{code}</b>. It expires in 24 hours.</p>")
}
