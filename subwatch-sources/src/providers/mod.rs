/*!
One adapter per public source
*/

pub mod alienvault;
pub mod anubis;
pub mod crtsh;
pub mod hackertarget;
pub mod rapiddns;
pub mod urlscan;
