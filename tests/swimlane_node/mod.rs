mod gray_release_case1;
mod restart_case1;
