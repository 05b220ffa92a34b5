use actix_files::Files;

pub const ASSET_DIR: &str = "public/assets";

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(Files::new("/assets", ASSET_DIR).prefer_utf8(true));
}
